pub mod candle_buffer;
pub mod csv_parser;

pub use candle_buffer::CandleBuffer;
pub use csv_parser::FeedCsvParser;
