pub mod record_store;
