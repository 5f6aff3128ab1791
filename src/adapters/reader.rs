//! CR95HF NFC transceiver adapter (SPI).
//!
//! Implements [`TagReaderPort`] over the ST CR95HF command set: protocol
//! select for ISO14443A, REQA plus anticollision for the UID, and the
//! tag-detection idle mode used as the low-power wait between scans.
//!
//! ESP-IDF only — host tests drive the scanner through mock readers.

#![cfg(target_os = "espidf")]

use std::thread;
use std::time::Duration;

use esp_idf_svc::sys::*;
use log::{debug, info};

use crate::allowlist::TagId;
use crate::app::ports::TagReaderPort;
use crate::drivers::hw_init;
use crate::error::ReaderError;
use crate::pins;

// CR95HF SPI control bytes.
const CTRL_SEND: u8 = 0x00;
const CTRL_RESET: u8 = 0x01;
const CTRL_READ: u8 = 0x02;
const CTRL_POLL: u8 = 0x03;

// CR95HF commands.
const CMD_PROTOCOL_SELECT: u8 = 0x02;
const CMD_SEND_RECV: u8 = 0x04;
const CMD_IDLE: u8 = 0x07;

// ISO14443A frames.
const REQA: u8 = 0x26;
const ANTICOLL_CL1: [u8; 2] = [0x93, 0x20];
const ANTICOLL_CL2: [u8; 2] = [0x95, 0x20];
const SELECT_CL1: u8 = 0x93;
const CASCADE_TAG: u8 = 0x88;

const RESP_OK: u8 = 0x00;
const POLL_DATA_READY: u8 = 0x08;

pub struct Cr95hfReader {
    device: spi_device_handle_t,
}

// The SPI handle is owned by the scanner thread after new().
unsafe impl Send for Cr95hfReader {}

impl Cr95hfReader {
    /// Bring up the SPI bus and verify the transceiver answers the echo
    /// command. A silent transceiver is fatal at startup.
    pub fn new() -> Result<Self, ReaderError> {
        let bus_cfg = spi_bus_config_t {
            __bindgen_anon_1: spi_bus_config_t__bindgen_ty_1 {
                mosi_io_num: pins::READER_SPI_MOSI_GPIO,
            },
            __bindgen_anon_2: spi_bus_config_t__bindgen_ty_2 {
                miso_io_num: pins::READER_SPI_MISO_GPIO,
            },
            sclk_io_num: pins::READER_SPI_SCLK_GPIO,
            __bindgen_anon_3: spi_bus_config_t__bindgen_ty_3 { quadwp_io_num: -1 },
            __bindgen_anon_4: spi_bus_config_t__bindgen_ty_4 { quadhd_io_num: -1 },
            max_transfer_sz: 64,
            ..Default::default()
        };
        // SAFETY: one-time bus setup before the scanner thread starts.
        let ret = unsafe {
            spi_bus_initialize(
                spi_host_device_t_SPI2_HOST,
                &bus_cfg,
                spi_common_dma_t_SPI_DMA_CH_AUTO,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(ReaderError::NotReady);
        }

        let dev_cfg = spi_device_interface_config_t {
            clock_speed_hz: 1_000_000,
            mode: 0,
            spics_io_num: pins::READER_SPI_CS_GPIO,
            queue_size: 1,
            ..Default::default()
        };
        let mut device: spi_device_handle_t = core::ptr::null_mut();
        // SAFETY: bus initialised above.
        let ret = unsafe {
            spi_bus_add_device(spi_host_device_t_SPI2_HOST, &dev_cfg, &mut device)
        };
        if ret != ESP_OK as i32 {
            return Err(ReaderError::NotReady);
        }

        let mut reader = Self { device };
        reader.reset();

        // Echo command: one 0x55 in, one 0x55 back.
        let mut echo = [0u8; 1];
        reader.transfer(&[CTRL_SEND, 0x55], &mut [])?;
        reader.poll_ready()?;
        reader.transfer(&[CTRL_READ], &mut echo)?;
        if echo[0] != 0x55 {
            return Err(ReaderError::NotReady);
        }

        info!("reader: CR95HF up");
        Ok(reader)
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), ReaderError> {
        let len = tx.len().max(rx.len());
        let mut tx_buf = [0u8; 64];
        let mut rx_buf = [0u8; 64];
        tx_buf[..tx.len()].copy_from_slice(tx);

        let mut txn = spi_transaction_t {
            length: (len * 8),
            __bindgen_anon_1: spi_transaction_t__bindgen_ty_1 {
                tx_buffer: tx_buf.as_ptr().cast(),
            },
            __bindgen_anon_2: spi_transaction_t__bindgen_ty_2 {
                rx_buffer: rx_buf.as_mut_ptr().cast(),
            },
            ..Default::default()
        };
        // SAFETY: buffers outlive the blocking transaction.
        let ret = unsafe { spi_device_transmit(self.device, &mut txn) };
        if ret != ESP_OK as i32 {
            return Err(ReaderError::NotReady);
        }
        // Response bytes trail the control/command bytes we clocked out.
        rx.copy_from_slice(&rx_buf[tx.len()..tx.len() + rx.len()]);
        Ok(())
    }

    /// Poll the flags register until the data-ready bit sets.
    fn poll_ready(&mut self) -> Result<(), ReaderError> {
        for _ in 0..100 {
            let mut flags = [0u8; 1];
            self.transfer(&[CTRL_POLL], &mut flags)?;
            if flags[0] & POLL_DATA_READY != 0 {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(1));
        }
        Err(ReaderError::NotReady)
    }

    /// Send one CR95HF command frame and read back the response payload.
    fn command(&mut self, cmd: u8, data: &[u8], resp: &mut [u8]) -> Result<usize, ReaderError> {
        let mut frame = [0u8; 32];
        frame[0] = CTRL_SEND;
        frame[1] = cmd;
        frame[2] = data.len() as u8;
        frame[3..3 + data.len()].copy_from_slice(data);
        self.transfer(&frame[..3 + data.len()], &mut [])?;

        self.poll_ready()?;

        let mut header = [0u8; 2];
        self.transfer(&[CTRL_READ], &mut header)?;
        let (code, len) = (header[0], header[1] as usize);
        if code != RESP_OK || len > resp.len() {
            debug!("reader: response code {code:#04x}, len {len}");
            return Err(ReaderError::SelectFailed);
        }
        if len > 0 {
            self.transfer(&[], &mut resp[..len])?;
        }
        Ok(len)
    }

    fn select_iso14443a(&mut self) -> Result<(), ReaderError> {
        let mut resp = [0u8; 2];
        // Protocol code 2 (ISO14443A), 106 kbps both directions.
        self.command(CMD_PROTOCOL_SELECT, &[0x02, 0x00], &mut resp)
            .map_err(|_| ReaderError::SelectFailed)?;
        Ok(())
    }

    /// Exchange one ISO14443A frame. The trailing byte encodes the
    /// significant bits of the last transmitted byte.
    fn send_recv(&mut self, frame: &[u8], resp: &mut [u8]) -> Result<usize, ReaderError> {
        self.command(CMD_SEND_RECV, frame, resp)
    }
}

impl TagReaderPort for Cr95hfReader {
    fn wait_for_tag(&mut self) -> Result<(), ReaderError> {
        // Idle command: wake on tag detection, WU period ~100 ms. The
        // transceiver refuses this right after a tag vanished
        // mid-transaction; the caller resets and retries.
        let params = [
            0x02, // wake-up source: tag detect
            0x21, 0x00, 0x79, 0x01, // enter/exit control
            0x18, 0x00, // leave control
            0x20, // WU period
            0x60, 0x60, // osc + DAC start
            0x64, 0x74, // DAC data window
            0x3F, 0x08, // swing + max sleep
        ];
        let mut resp = [0u8; 1];
        self.command(CMD_IDLE, &params, &mut resp)
            .map_err(|_| ReaderError::SleepUnavailable)?;

        // The IRQ line drops when the field detector trips.
        while hw_init::gpio_read(pins::READER_IRQ_GPIO) {
            thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    fn reset(&mut self) {
        let _ = self.transfer(&[CTRL_RESET], &mut []);
        thread::sleep(Duration::from_millis(10));
        // Rising edge on IRQ_IN (via a dummy byte) restarts the device.
        let _ = self.transfer(&[0x00], &mut []);
        thread::sleep(Duration::from_millis(10));
    }

    fn select(&mut self) -> Result<TagId, ReaderError> {
        self.select_iso14443a()?;

        // REQA is a short frame: 7 significant bits.
        let mut atqa = [0u8; 2];
        self.send_recv(&[REQA, 0x07], &mut atqa)
            .map_err(|_| ReaderError::NoTag)?;

        // Cascade level 1.
        let mut cl1 = [0u8; 5];
        let n = self.send_recv(&[ANTICOLL_CL1[0], ANTICOLL_CL1[1], 0x08], &mut cl1)?;
        if n < 5 {
            return Err(ReaderError::SelectFailed);
        }

        let mut uid = TagId::new();
        if cl1[0] == CASCADE_TAG {
            // 7-byte UID: select level 1, then anticollision level 2.
            let mut sel = [0u8; 8];
            sel[0] = SELECT_CL1;
            sel[1] = 0x70;
            sel[2..7].copy_from_slice(&cl1);
            sel[7] = 0x08;
            let mut sak = [0u8; 1];
            self.send_recv(&sel, &mut sak)?;

            let mut cl2 = [0u8; 5];
            let n = self.send_recv(&[ANTICOLL_CL2[0], ANTICOLL_CL2[1], 0x08], &mut cl2)?;
            if n < 5 {
                return Err(ReaderError::SelectFailed);
            }
            if uid.extend_from_slice(&cl1[1..4]).is_err()
                || uid.extend_from_slice(&cl2[..4]).is_err()
            {
                return Err(ReaderError::SelectFailed);
            }
        } else {
            if uid.extend_from_slice(&cl1[..4]).is_err() {
                return Err(ReaderError::SelectFailed);
            }
        }

        debug!("reader: tag {:02x?}", uid.as_slice());
        Ok(uid)
    }
}
