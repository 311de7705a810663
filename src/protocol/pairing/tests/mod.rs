mod client;
mod frame;
