use chrono::Duration;
use rand::Rng;

/// Number of digits in a delivery confirmation code.
pub const OTP_LENGTH: u32 = 6;

/// How long a dispatched code remains valid.
pub fn otp_validity() -> Duration {
    Duration::minutes(10)
}

/// Generates a numeric delivery confirmation code of [`OTP_LENGTH`] digits (no leading zeros, so
/// the code survives being treated as a number anywhere along the delivery chain).
pub fn generate_otp() -> String {
    let low = 10u32.pow(OTP_LENGTH - 1);
    let high = 10u32.pow(OTP_LENGTH);
    let code = rand::thread_rng().gen_range(low..high);
    code.to_string()
}
