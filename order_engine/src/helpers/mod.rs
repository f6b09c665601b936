mod distance;
mod otp;

pub use distance::{distance_km, INVALID_DISTANCE_KM};
pub use otp::{generate_otp, otp_validity, OTP_LENGTH};
