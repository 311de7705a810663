mod gcm;
mod keystore;
