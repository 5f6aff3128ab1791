//! Motor current sampling via the continuous (DMA) ADC driver.
//!
//! The ADC free-runs at 2 kHz into 20-sample frames, so one completed
//! frame both measures the shunt voltage and paces a 10 ms supervisor
//! cycle.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: adc_continuous driver plus curve-fitting calibration.
//! On host/test: a 10 ms sleep stands in for the frame period.

use crate::app::ports::CurrentSense;
use crate::error::MotorError;
use crate::motor::ADC_BATCH_SIZE;

/// GPIO5 maps to ADC1 channel 4 on the ESP32-S3.
#[cfg(target_os = "espidf")]
const SENSE_CHANNEL: u8 = 4;

/// 20 samples at 500 µs apiece per frame.
#[cfg(target_os = "espidf")]
const SAMPLE_FREQ_HZ: u32 = 2_000;

#[cfg(target_os = "espidf")]
pub struct CurrentSenseAdc {
    handle: esp_idf_svc::sys::adc_continuous_handle_t,
    cali: esp_idf_svc::sys::adc_cali_handle_t,
}

// The raw handles are only ever used from the motor thread after new().
#[cfg(target_os = "espidf")]
unsafe impl Send for CurrentSenseAdc {}

#[cfg(target_os = "espidf")]
impl CurrentSenseAdc {
    pub fn new() -> Result<Self, MotorError> {
        use esp_idf_svc::sys::*;

        let mut handle: adc_continuous_handle_t = core::ptr::null_mut();
        let handle_cfg = adc_continuous_handle_cfg_t {
            max_store_buf_size: (ADC_BATCH_SIZE * 4 * 4) as u32,
            conv_frame_size: (ADC_BATCH_SIZE * 4) as u32,
            ..Default::default()
        };
        // SAFETY: plain driver-creation call; handle outlives the driver.
        let ret = unsafe { adc_continuous_new_handle(&handle_cfg, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(MotorError::AdcNotReady);
        }

        let mut pattern = adc_digi_pattern_config_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12 as u8,
            channel: SENSE_CHANNEL,
            unit: adc_unit_t_ADC_UNIT_1 as u8,
            bit_width: adc_bitwidth_t_ADC_BITWIDTH_12 as u8,
        };
        let dig_cfg = adc_continuous_config_t {
            pattern_num: 1,
            adc_pattern: &mut pattern,
            sample_freq_hz: SAMPLE_FREQ_HZ,
            conv_mode: adc_digi_convert_mode_t_ADC_CONV_SINGLE_UNIT_1,
            format: adc_digi_output_format_t_ADC_DIGI_OUTPUT_FORMAT_TYPE2,
        };
        // SAFETY: handle was just created; pattern lives across the call.
        let ret = unsafe { adc_continuous_config(handle, &dig_cfg) };
        if ret != ESP_OK as i32 {
            return Err(MotorError::AdcNotReady);
        }

        let mut cali: adc_cali_handle_t = core::ptr::null_mut();
        let cali_cfg = adc_cali_curve_fitting_config_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            chan: SENSE_CHANNEL as u32,
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: calibration scheme creation; a failure leaves cali null
        // and raw_to_millivolts falls back to the linear estimate.
        unsafe { adc_cali_create_scheme_curve_fitting(&cali_cfg, &mut cali) };

        // SAFETY: handle configured above.
        let ret = unsafe { adc_continuous_start(handle) };
        if ret != ESP_OK as i32 {
            return Err(MotorError::SampleSubmitFailed);
        }

        Ok(Self { handle, cali })
    }
}

#[cfg(target_os = "espidf")]
impl CurrentSense for CurrentSenseAdc {
    fn wait_batch(&mut self, buf: &mut [u16; ADC_BATCH_SIZE]) {
        use esp_idf_svc::sys::*;

        let mut raw = [0u8; ADC_BATCH_SIZE * 4];
        let mut got: u32 = 0;
        // SAFETY: blocking read into a frame-sized local buffer.
        let ret = unsafe {
            adc_continuous_read(
                self.handle,
                raw.as_mut_ptr(),
                raw.len() as u32,
                &mut got,
                u32::MAX,
            )
        };
        if ret != ESP_OK as i32 {
            buf.fill(0);
            return;
        }
        for (i, slot) in buf.iter_mut().enumerate() {
            let off = i * 4;
            if off + 4 <= got as usize {
                // TYPE2 output: bits 0-11 carry the sample.
                let word = u32::from_le_bytes([
                    raw[off],
                    raw[off + 1],
                    raw[off + 2],
                    raw[off + 3],
                ]);
                *slot = (word & 0xFFF) as u16;
            } else {
                *slot = 0;
            }
        }
    }

    fn resubmit(&mut self) -> Result<(), MotorError> {
        // The continuous driver free-runs; nothing to re-arm.
        Ok(())
    }

    fn raw_to_millivolts(&self, raw: u16) -> u32 {
        use esp_idf_svc::sys::*;

        if !self.cali.is_null() {
            let mut mv: i32 = 0;
            // SAFETY: cali handle created in new() and never freed.
            let ret = unsafe { adc_cali_raw_to_voltage(self.cali, i32::from(raw), &mut mv) };
            if ret == ESP_OK as i32 {
                return mv.max(0) as u32;
            }
        }
        // Linear fallback: 12-bit full scale over 3V3.
        u32::from(raw) * 3_300 / 4_095
    }
}

/// Host stand-in: idle shunt, real frame timing.
#[cfg(not(target_os = "espidf"))]
pub struct CurrentSenseAdc;

#[cfg(not(target_os = "espidf"))]
impl CurrentSenseAdc {
    pub fn new() -> Result<Self, MotorError> {
        Ok(Self)
    }
}

#[cfg(not(target_os = "espidf"))]
impl CurrentSense for CurrentSenseAdc {
    fn wait_batch(&mut self, buf: &mut [u16; ADC_BATCH_SIZE]) {
        std::thread::sleep(std::time::Duration::from_millis(10));
        buf.fill(0);
    }

    fn resubmit(&mut self) -> Result<(), MotorError> {
        Ok(())
    }

    fn raw_to_millivolts(&self, raw: u16) -> u32 {
        u32::from(raw) * 3_300 / 4_095
    }
}
