mod helpers;

mod pairing;
mod sensor_client;
mod session;
mod tls;
mod transport;
