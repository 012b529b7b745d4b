mod cli;
mod console_consumer;
mod file_store;
mod logger;
