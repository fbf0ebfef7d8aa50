//! Picks the panel implementation once, at startup.

use log::{info, warn};
use paperview_core::config::ServiceConfig;
use paperview_core::display::Display;
use paperview_core::epd7in5_v2::{HEIGHT, WIDTH};
use paperview_core::simulated::SimulatedDisplay;

pub fn open_display(config: &ServiceConfig, force_simulation: bool) -> Box<dyn Display> {
    if force_simulation {
        info!("Simulation requested, e-Paper hardware will not be touched");
    } else {
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        {
            match linux::open() {
                Ok(panel) => {
                    info!("e-Paper panel found on {}", linux::SPI_PATH);
                    return Box::new(panel);
                }
                Err(err) => {
                    warn!("e-Paper hardware not available, running in simulation mode: {err:#}")
                }
            }
        }
        #[cfg(not(all(feature = "hardware", target_os = "linux")))]
        warn!("Built without hardware support, running in simulation mode");
    }
    simulated(config)
}

fn simulated(config: &ServiceConfig) -> Box<dyn Display> {
    let display = SimulatedDisplay::new(WIDTH, HEIGHT);
    match &config.preview {
        Some(path) => Box::new(display.with_preview(path)),
        None => Box::new(display),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod linux {
    use anyhow::Context;
    use embedded_hal::digital::OutputPin;
    use linux_embedded_hal::{
        CdevPin, Delay, SpidevDevice,
        gpio_cdev::{Chip, LineRequestFlags},
        spidev::{SpiModeFlags, SpidevOptions},
    };
    use paperview_core::display::{Display, DisplayError, RefreshMode};
    use paperview_core::epd7in5_v2::Epd7in5V2;
    use paperview_core::framebuffer::MonoFrame;

    pub const SPI_PATH: &str = "/dev/spidev0.0";
    const GPIO_CHIP: &str = "/dev/gpiochip0";

    // BCM numbering, Waveshare e-Paper HAT.
    const RST_PIN: u32 = 17;
    const DC_PIN: u32 = 25;
    const BUSY_PIN: u32 = 24;
    const PWR_PIN: u32 = 18;

    type Panel = Epd7in5V2<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

    pub struct LinuxPanel {
        epd: Panel,
        pwr: CdevPin,
    }

    fn request(
        chip: &mut Chip,
        offset: u32,
        flags: LineRequestFlags,
        level: u8,
        label: &str,
    ) -> anyhow::Result<CdevPin> {
        let handle = chip
            .get_line(offset)
            .with_context(|| format!("getting GPIO line {offset}"))?
            .request(flags, level, label)
            .with_context(|| format!("requesting {label} line"))?;
        CdevPin::new(handle).with_context(|| format!("creating {label} pin"))
    }

    pub fn open() -> anyhow::Result<LinuxPanel> {
        let mut spi = SpidevDevice::open(SPI_PATH).context("opening SPI device")?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("configuring SPI")?;

        let mut chip = Chip::new(GPIO_CHIP).context("opening GPIO chip")?;
        let rst = request(&mut chip, RST_PIN, LineRequestFlags::OUTPUT, 0, "paperview-rst")?;
        let dc = request(&mut chip, DC_PIN, LineRequestFlags::OUTPUT, 0, "paperview-dc")?;
        let pwr = request(&mut chip, PWR_PIN, LineRequestFlags::OUTPUT, 1, "paperview-pwr")?;
        let busy = request(&mut chip, BUSY_PIN, LineRequestFlags::INPUT, 0, "paperview-busy")?;

        Ok(LinuxPanel {
            epd: Epd7in5V2::new(spi, busy, dc, rst, Delay {}),
            pwr,
        })
    }

    impl Display for LinuxPanel {
        fn dimensions(&self) -> (u32, u32) {
            self.epd.dimensions()
        }

        fn initialize(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
            self.epd.initialize(mode)
        }

        fn push(&mut self, frame: &MonoFrame) -> Result<(), DisplayError> {
            self.epd.push(frame)
        }

        fn sleep(&mut self) -> Result<(), DisplayError> {
            self.epd.sleep()
        }

        fn shutdown(&mut self) -> Result<(), DisplayError> {
            self.epd.shutdown()?;
            self.pwr
                .set_low()
                .map_err(|err| DisplayError::Gpio(format!("{err:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_simulation_uses_panel_resolution() {
        let display = open_display(&ServiceConfig::default(), true);
        assert!(display.is_simulated());
        assert_eq!(display.dimensions(), (800, 480));
    }
}
