//! Waveshare 7.5" V2 (800x480, black/white) panel over `embedded-hal` 1.0.
//!
//! Command sequences follow the vendor reference code. The busy line is low
//! while the controller works; waits are unbounded.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};
use log::{debug, info};

use crate::display::{Display, DisplayError, RefreshMode};
use crate::framebuffer::MonoFrame;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 480;

const PANEL_SETTING: u8 = 0x00;
const POWER_SETTING: u8 = 0x01;
const POWER_OFF: u8 = 0x02;
const POWER_ON: u8 = 0x04;
const BOOSTER_SOFT_START: u8 = 0x06;
const DEEP_SLEEP: u8 = 0x07;
const DATA_START_OLD: u8 = 0x10;
const DISPLAY_REFRESH: u8 = 0x12;
const DATA_START_NEW: u8 = 0x13;
const DUAL_SPI: u8 = 0x15;
const VCOM_DATA_INTERVAL: u8 = 0x50;
const TCON_SETTING: u8 = 0x60;
const RESOLUTION_SETTING: u8 = 0x61;
const GET_STATUS: u8 = 0x71;
const CASCADE_SETTING: u8 = 0xE0;
const FORCE_TEMPERATURE: u8 = 0xE5;

/// Largest single SPI write; Linux spidev rejects longer transfers by default.
const MAX_TRANSFER: usize = 4096;

pub struct Epd7in5V2<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
    delay: DELAY,
}

impl<SPI, BUSY, DC, RST, DELAY> Epd7in5V2<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, busy: BUSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        Self {
            spi,
            busy,
            dc,
            rst,
            delay,
        }
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(gpio_err)?;
        self.delay.delay_ms(20);
        self.rst.set_low().map_err(gpio_err)?;
        self.delay.delay_ms(2);
        self.rst.set_high().map_err(gpio_err)?;
        self.delay.delay_ms(20);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(gpio_err)?;
        self.spi.write(&[command]).map_err(spi_err)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(gpio_err)?;
        for chunk in data.chunks(MAX_TRANSFER) {
            self.spi.write(chunk).map_err(spi_err)?;
        }
        Ok(())
    }

    fn command_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.send_command(command)?;
        self.send_data(data)
    }

    fn wait_until_idle(&mut self) -> Result<(), DisplayError> {
        debug!("e-Paper busy");
        self.send_command(GET_STATUS)?;
        while self.busy.is_low().map_err(gpio_err)? {
            self.send_command(GET_STATUS)?;
            self.delay.delay_ms(20);
        }
        self.delay.delay_ms(20);
        debug!("e-Paper busy release");
        Ok(())
    }

    fn init_full(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.command_with_data(BOOSTER_SOFT_START, &[0x17, 0x17, 0x28, 0x17])?;
        self.command_with_data(POWER_SETTING, &[0x07, 0x07, 0x3F, 0x3F])?;
        self.send_command(POWER_ON)?;
        self.delay.delay_ms(100);
        self.wait_until_idle()?;

        self.command_with_data(PANEL_SETTING, &[0x1F])?;
        self.command_with_data(RESOLUTION_SETTING, &resolution_bytes())?;
        self.command_with_data(DUAL_SPI, &[0x00])?;
        self.command_with_data(VCOM_DATA_INTERVAL, &[0x10, 0x07])?;
        self.command_with_data(TCON_SETTING, &[0x22])
    }

    fn init_fast(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.command_with_data(PANEL_SETTING, &[0x1F])?;
        self.command_with_data(VCOM_DATA_INTERVAL, &[0x10, 0x07])?;
        self.send_command(POWER_ON)?;
        self.delay.delay_ms(100);
        self.wait_until_idle()?;

        // Enhanced drive strength plus a forced temperature selects the fast waveform.
        self.command_with_data(BOOSTER_SOFT_START, &[0x27, 0x27, 0x18, 0x17])?;
        self.command_with_data(CASCADE_SETTING, &[0x02])?;
        self.command_with_data(FORCE_TEMPERATURE, &[0x5A])
    }
}

impl<SPI, BUSY, DC, RST, DELAY> Display for Epd7in5V2<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn dimensions(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn initialize(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        info!("Initializing e-Paper ({mode})");
        match mode {
            RefreshMode::Full => self.init_full(),
            RefreshMode::Fast => self.init_fast(),
        }
    }

    fn push(&mut self, frame: &MonoFrame) -> Result<(), DisplayError> {
        if frame.dimensions() != (WIDTH, HEIGHT) {
            return Err(DisplayError::FrameSize {
                got: frame.dimensions(),
                expected: (WIDTH, HEIGHT),
            });
        }
        let old = frame.inverted();
        self.command_with_data(DATA_START_OLD, &old)?;
        self.command_with_data(DATA_START_NEW, frame.bytes())?;
        self.send_command(DISPLAY_REFRESH)?;
        self.delay.delay_ms(100);
        self.wait_until_idle()
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.command_with_data(VCOM_DATA_INTERVAL, &[0xF7])?;
        self.send_command(POWER_OFF)?;
        self.wait_until_idle()?;
        self.command_with_data(DEEP_SLEEP, &[0xA5])?;
        self.delay.delay_ms(2000);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.rst.set_low().map_err(gpio_err)?;
        self.dc.set_low().map_err(gpio_err)
    }
}

fn resolution_bytes() -> [u8; 4] {
    let [w_hi, w_lo] = (WIDTH as u16).to_be_bytes();
    let [h_hi, h_lo] = (HEIGHT as u16).to_be_bytes();
    [w_hi, w_lo, h_hi, h_lo]
}

fn spi_err<E: core::fmt::Debug>(err: E) -> DisplayError {
    DisplayError::Spi(format!("{err:?}"))
}

fn gpio_err<E: core::fmt::Debug>(err: E) -> DisplayError {
    DisplayError::Gpio(format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_hal::{digital, spi};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Wire {
        Command(u8),
        Data(Vec<u8>),
    }

    #[derive(Clone, Default)]
    struct Bus {
        wire: Rc<RefCell<Vec<Wire>>>,
        dc_high: Rc<Cell<bool>>,
        rst_edges: Rc<RefCell<Vec<bool>>>,
        slept_ms: Rc<Cell<u64>>,
    }

    impl Bus {
        fn commands(&self) -> Vec<u8> {
            self.wire
                .borrow()
                .iter()
                .filter_map(|w| match w {
                    Wire::Command(c) => Some(*c),
                    Wire::Data(_) => None,
                })
                .collect()
        }

        fn data_after(&self, command: u8) -> Vec<u8> {
            let wire = self.wire.borrow();
            let pos = wire
                .iter()
                .position(|w| *w == Wire::Command(command))
                .unwrap();
            match &wire[pos + 1] {
                Wire::Data(d) => d.clone(),
                Wire::Command(c) => panic!("command 0x{c:02X} has no data"),
            }
        }
    }

    struct FakeSpi(Bus);
    struct FakeDc(Bus);
    struct FakeRst(Bus);
    struct FakeDelay(Bus);
    struct FakeBusy {
        busy_reads: usize,
    }

    impl spi::ErrorType for FakeSpi {
        type Error = Infallible;
    }

    impl SpiDevice for FakeSpi {
        fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Infallible> {
            for op in operations {
                if let spi::Operation::Write(bytes) = op {
                    assert!(bytes.len() <= MAX_TRANSFER);
                    let mut wire = self.0.wire.borrow_mut();
                    if !self.0.dc_high.get() {
                        assert_eq!(bytes.len(), 1);
                        wire.push(Wire::Command(bytes[0]));
                    } else if let Some(Wire::Data(prev)) = wire.last_mut() {
                        prev.extend_from_slice(bytes);
                    } else {
                        wire.push(Wire::Data(bytes.to_vec()));
                    }
                }
            }
            Ok(())
        }
    }

    impl digital::ErrorType for FakeDc {
        type Error = Infallible;
    }

    impl OutputPin for FakeDc {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.dc_high.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.dc_high.set(true);
            Ok(())
        }
    }

    impl digital::ErrorType for FakeRst {
        type Error = Infallible;
    }

    impl OutputPin for FakeRst {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.rst_edges.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.rst_edges.borrow_mut().push(true);
            Ok(())
        }
    }

    impl digital::ErrorType for FakeBusy {
        type Error = Infallible;
    }

    impl InputPin for FakeBusy {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!self.is_low()?)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            if self.busy_reads > 0 {
                self.busy_reads -= 1;
                return Ok(true);
            }
            Ok(false)
        }
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.slept_ms.set(self.0.slept_ms.get() + u64::from(ns) / 1_000_000);
        }
    }

    type TestPanel = Epd7in5V2<FakeSpi, FakeBusy, FakeDc, FakeRst, FakeDelay>;

    fn panel(busy_reads: usize) -> (TestPanel, Bus) {
        let bus = Bus::default();
        let epd = Epd7in5V2::new(
            FakeSpi(bus.clone()),
            FakeBusy { busy_reads },
            FakeDc(bus.clone()),
            FakeRst(bus.clone()),
            FakeDelay(bus.clone()),
        );
        (epd, bus)
    }

    #[test]
    fn full_init_sequence() {
        let (mut epd, bus) = panel(0);
        epd.initialize(RefreshMode::Full).unwrap();

        assert_eq!(*bus.rst_edges.borrow(), vec![true, false, true]);
        assert_eq!(
            bus.commands(),
            vec![0x06, 0x01, 0x04, 0x71, 0x00, 0x61, 0x15, 0x50, 0x60]
        );
        assert_eq!(bus.data_after(RESOLUTION_SETTING), vec![0x03, 0x20, 0x01, 0xE0]);
        assert_eq!(bus.data_after(BOOSTER_SOFT_START), vec![0x17, 0x17, 0x28, 0x17]);
        assert_eq!(bus.data_after(POWER_SETTING), vec![0x07, 0x07, 0x3F, 0x3F]);
    }

    #[test]
    fn fast_init_sequence() {
        let (mut epd, bus) = panel(0);
        epd.initialize(RefreshMode::Fast).unwrap();

        assert_eq!(bus.commands(), vec![0x00, 0x50, 0x04, 0x71, 0x06, 0xE0, 0xE5]);
        assert_eq!(bus.data_after(BOOSTER_SOFT_START), vec![0x27, 0x27, 0x18, 0x17]);
        assert_eq!(bus.data_after(FORCE_TEMPERATURE), vec![0x5A]);
    }

    #[test]
    fn push_sends_both_data_channels() {
        let (mut epd, bus) = panel(0);
        let mut frame = MonoFrame::new(WIDTH, HEIGHT);
        frame.set_pixel(0, 0, BinaryColor::On);
        epd.push(&frame).unwrap();

        assert_eq!(bus.commands(), vec![0x10, 0x13, 0x12, 0x71]);
        let old = bus.data_after(DATA_START_OLD);
        let new = bus.data_after(DATA_START_NEW);
        assert_eq!(new.len(), (WIDTH * HEIGHT / 8) as usize);
        assert_eq!(new[0], 0x80);
        assert_eq!(old[0], 0x7F);
        assert_eq!(old[1], 0xFF);
    }

    #[test]
    fn push_rejects_wrong_resolution() {
        let (mut epd, bus) = panel(0);
        let err = epd.push(&MonoFrame::new(200, 200)).unwrap_err();
        assert!(matches!(err, DisplayError::FrameSize { .. }));
        assert!(bus.commands().is_empty());
    }

    #[test]
    fn busy_wait_polls_status_until_released() {
        let (mut epd, bus) = panel(3);
        epd.sleep().unwrap();

        assert_eq!(
            bus.commands(),
            vec![0x50, 0x02, 0x71, 0x71, 0x71, 0x71, 0x07]
        );
        assert_eq!(bus.data_after(DEEP_SLEEP), vec![0xA5]);
        assert!(bus.slept_ms.get() >= 2000 + 3 * 20);
    }

    #[test]
    fn shutdown_drops_control_lines() {
        let (mut epd, bus) = panel(0);
        epd.shutdown().unwrap();
        assert_eq!(*bus.rst_edges.borrow(), vec![false]);
        assert!(!bus.dc_high.get());
    }
}
