mod handshake;
mod ssl_request;

pub use handshake::{
    AuthSwitchRequest, CachingSha2PasswordFastAuthResult, Handshake, HandshakeConfig,
    HandshakeResponse41, HandshakeResult, InitialHandshake, MAX_PACKET_SIZE,
    auth_caching_sha2_password, auth_mysql_native_password, auth_response,
    read_initial_handshake,
};
pub use ssl_request::write_ssl_request;
