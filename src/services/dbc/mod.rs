pub mod database_client;
