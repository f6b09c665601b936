mod money;

pub use money::{Money, MoneyConversionError, MONEY_TOLERANCE};
