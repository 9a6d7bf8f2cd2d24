use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    /// The bus stayed low after releasing it; something is holding the
    /// line to ground.
    #[error("single-wire bus shorted")]
    BusShorted,
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
}

pub type Result<T> = std::result::Result<T, HwError>;
