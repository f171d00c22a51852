pub mod paginator;

pub use paginator::ReactivePaginator;
