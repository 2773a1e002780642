pub mod dispatch;
pub mod parse;
