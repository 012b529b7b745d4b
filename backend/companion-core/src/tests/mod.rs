mod action_queue;
mod config;
mod crypto;
mod frame;
mod pairing_code;
mod pairing_state;
mod store;
