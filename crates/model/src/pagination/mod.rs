pub mod cursor;
pub mod page;
pub mod page_size;
