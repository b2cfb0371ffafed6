mod google;
mod in_memory;

pub use google::GoogleSheetsStore;
pub use in_memory::InMemorySheetStore;
