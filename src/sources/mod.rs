pub mod readings_csv;

pub use readings_csv::ReadingsCsvSource;
