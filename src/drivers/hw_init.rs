//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, LEDC timer/channels for the H-bridge, the
//! maintenance UART and the GPIO interrupt handlers using raw ESP-IDF sys
//! calls. Called once from `main()` before any task starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={rc})"),
            Self::UartInitFailed(rc) => write!(f, "UART driver install failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

pub const LEDC_CH_MOTOR_FWD: u32 = 0;
pub const LEDC_CH_MOTOR_REV: u32 = 1;

#[cfg(target_os = "espidf")]
const CONSOLE_UART: uart_port_t = 1;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before any task is spawned.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc()?;
        init_uart()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let input_pins = [
        pins::HALL_CLOSED_GPIO,
        pins::HALL_PARCEL_OPEN_GPIO,
        pins::HALL_MAIL_OPEN_GPIO,
        pins::BUTTON_PARCEL_GPIO,
        pins::BUTTON_MAIL_GPIO,
        pins::JUMPER_GPIO,
        pins::READER_IRQ_GPIO,
    ];

    for &pin in &input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::LED_GREEN_GPIO,
        pins::LED_RED_GPIO,
        pins::VDD_EN_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    // Peripheral rail on from the start; the power manager owns it after.
    unsafe { gpio_set_level(pins::VDD_EN_GPIO, 1) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM (H-bridge) ───────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::MOTOR_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let channels = [
        (LEDC_CH_MOTOR_FWD, pins::MOTOR_FWD_PWM_GPIO),
        (LEDC_CH_MOTOR_REV, pins::MOTOR_REV_PWM_GPIO),
    ];
    for &(channel, gpio) in &channels {
        let ret = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: ledc_timer_t_LEDC_TIMER_0,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    info!("hw_init: LEDC configured (motor fwd=CH0, rev=CH1)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: channels were configured in init_ledc(); only the motor task
    // writes duty registers.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

// ── Maintenance UART ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: 115_200,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    unsafe {
        let ret = uart_driver_install(CONSOLE_UART, 256, 0, 0, core::ptr::null_mut(), 0);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
        let ret = uart_param_config(CONSOLE_UART, &cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
        let ret = uart_set_pin(
            CONSOLE_UART,
            pins::UART_TX_GPIO,
            pins::UART_RX_GPIO,
            -1,
            -1,
        );
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
    }
    info!("hw_init: console UART configured");
    Ok(())
}

/// Pull one buffered console byte, if any.
#[cfg(target_os = "espidf")]
pub fn uart_read_byte() -> Option<u8> {
    let mut byte = 0u8;
    // SAFETY: driver installed in init_uart(); zero timeout keeps this
    // non-blocking.
    let n = unsafe { uart_read_bytes(CONSOLE_UART, (&mut byte as *mut u8).cast(), 1, 0) };
    (n == 1).then_some(byte)
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_read_byte() -> Option<u8> {
    None
}

/// True when console bytes sit in the driver's RX buffer. Used as a wake
/// source while the control task sleeps.
#[cfg(target_os = "espidf")]
pub fn uart_rx_pending() -> bool {
    let mut pending: usize = 0;
    // SAFETY: read-only query of the installed driver's buffer state.
    let ret = unsafe { uart_get_buffered_data_len(CONSOLE_UART, &mut pending) };
    ret == ESP_OK as i32 && pending > 0
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_rx_pending() -> bool {
    false
}

// ── GPIO ISR service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::inputs;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn hall_closed_isr(_arg: *mut core::ffi::c_void) {
    inputs::on_hall_closed();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn hall_parcel_isr(_arg: *mut core::ffi::c_void) {
    inputs::on_hall_parcel_open();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn hall_mail_isr(_arg: *mut core::ffi::c_void) {
    inputs::on_hall_mail_open();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_parcel_isr(_arg: *mut core::ffi::c_void) {
    inputs::on_button_parcel();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_mail_isr(_arg: *mut core::ffi::c_void) {
    inputs::on_button_mail();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn jumper_isr(_arg: *mut core::ffi::c_void) {
    // Jumper fitted pulls the pin low.
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let asserted = unsafe { gpio_get_level(pins::JUMPER_GPIO) } == 0;
    inputs::on_mode_jumper(asserted);
}

/// Install the per-pin GPIO ISR service and register interrupt handlers.
/// Call after [`init_peripherals`] and before spawning tasks.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed. The handlers only touch atomics and
    // the critical-section command queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        // Hall sensors assert low at their detent.
        let halls: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 3] = [
            (pins::HALL_CLOSED_GPIO, hall_closed_isr),
            (pins::HALL_PARCEL_OPEN_GPIO, hall_parcel_isr),
            (pins::HALL_MAIL_OPEN_GPIO, hall_mail_isr),
        ];
        for (pin, handler) in halls {
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_NEGEDGE);
            gpio_isr_handler_add(pin, Some(handler), core::ptr::null_mut());
            gpio_intr_enable(pin);
        }

        // Buttons: falling edge, active-low.
        gpio_set_intr_type(pins::BUTTON_PARCEL_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        gpio_isr_handler_add(
            pins::BUTTON_PARCEL_GPIO,
            Some(button_parcel_isr),
            core::ptr::null_mut(),
        );
        gpio_intr_enable(pins::BUTTON_PARCEL_GPIO);

        gpio_set_intr_type(pins::BUTTON_MAIL_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        gpio_isr_handler_add(
            pins::BUTTON_MAIL_GPIO,
            Some(button_mail_isr),
            core::ptr::null_mut(),
        );
        gpio_intr_enable(pins::BUTTON_MAIL_GPIO);

        // Mode jumper: any edge, plus a seed read so the state machine
        // sees a fitted jumper before the first edge fires.
        gpio_set_intr_type(pins::JUMPER_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        gpio_isr_handler_add(pins::JUMPER_GPIO, Some(jumper_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::JUMPER_GPIO);
        inputs::on_mode_jumper(gpio_get_level(pins::JUMPER_GPIO) == 0);

        info!("hw_init: ISR service installed (hall×3, button×2, jumper)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
