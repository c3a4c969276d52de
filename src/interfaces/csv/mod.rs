pub mod inventory_writer;
