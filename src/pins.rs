//! GPIO / peripheral pin assignments for the PostBox controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Flap actuator driver (DRV8871 H-bridge, one PWM channel per direction)
// ---------------------------------------------------------------------------

/// LEDC PWM output: forward (locking) drive channel.
pub const MOTOR_FWD_PWM_GPIO: i32 = 1;
/// LEDC PWM output: reverse (unlocking) drive channel.
pub const MOTOR_REV_PWM_GPIO: i32 = 2;

/// Motor current sense — voltage over the 0.5 Ω shunt, ADC1 channel 4.
pub const MOTOR_SENSE_ADC_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Hall sensors (flap position endstops, one per detent)
// ---------------------------------------------------------------------------

/// Flap fully closed and latched.
pub const HALL_CLOSED_GPIO: i32 = 6;
/// Parcel compartment flap open.
pub const HALL_PARCEL_OPEN_GPIO: i32 = 7;
/// Mail compartment flap open.
pub const HALL_MAIL_OPEN_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Push-buttons (active-low, external pull-ups)
// ---------------------------------------------------------------------------

/// Courier button — requests the parcel compartment.
pub const BUTTON_PARCEL_GPIO: i32 = 15;
/// Mail release button — requests the mail compartment.
pub const BUTTON_MAIL_GPIO: i32 = 16;

/// Mode-select jumper: asserted = programming mode (learn tags).
pub const JUMPER_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Green LED — steady in normal mode, blinking in programming mode.
pub const LED_GREEN_GPIO: i32 = 11;
/// Red LED — active wait / parcel lockout.
pub const LED_RED_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Peripheral power rail
// ---------------------------------------------------------------------------

/// Enables the 3V3 peripheral rail (reader, hall sensors). Cut during sleep.
pub const VDD_EN_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// CR95HF NFC transceiver (SPI)
// ---------------------------------------------------------------------------

pub const READER_SPI_SCLK_GPIO: i32 = 36;
pub const READER_SPI_MOSI_GPIO: i32 = 35;
pub const READER_SPI_MISO_GPIO: i32 = 37;
pub const READER_SPI_CS_GPIO: i32 = 34;
/// IRQ_OUT from the reader, asserted on tag-detection wake.
pub const READER_IRQ_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// UART maintenance console
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for the flap motor (25 kHz — inaudible).
pub const MOTOR_PWM_FREQ_HZ: u32 = 25_000;
