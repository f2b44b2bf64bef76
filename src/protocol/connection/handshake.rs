use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{
    CAPABILITIES_ALWAYS_ENABLED, CAPABILITIES_CONFIGURABLE, CapabilityFlags, ServerStatusFlags,
};
use crate::error::{Error, Result};
use super::ssl_request::write_ssl_request;
use crate::protocol::packet::{ErrPayloadBytes, OkPayloadBytes};
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayload, OkPayload};

/// `max_packet_size` announced in the handshake response
pub const MAX_PACKET_SIZE: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct HandshakeFixedFields {
    connection_id: U32LE,
    auth_data_part1: [u8; 8],
    filler: u8,
    capability_flags_lower: U16LE,
    charset: u8,
    status_flags: U16LE,
    capability_flags_upper: U16LE,
    auth_data_len: u8,
}

/// HandshakeV10 sent by the server when a connection opens
#[derive(Debug, Clone)]
pub struct InitialHandshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    /// The 20-byte scramble, without its trailing NUL
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: CapabilityFlags,
    pub charset: u8,
    pub status_flags: ServerStatusFlags,
    pub auth_plugin_name: String,
}

/// Read initial handshake packet from server
pub fn read_initial_handshake(payload: &[u8]) -> Result<InitialHandshake> {
    let (protocol_version, data) = read_int_1(payload)?;

    if protocol_version == 0xFF {
        Err(ErrPayloadBytes(payload))?
    }
    if protocol_version != 10 {
        return Err(Error::Unsupported(format!(
            "handshake protocol version {protocol_version}"
        )));
    }

    let (server_version, data) = read_string_null(data)?;
    let server_version = String::from_utf8_lossy(server_version).into_owned();

    let (fixed, rest) =
        HandshakeFixedFields::ref_from_prefix(data).map_err(|_e| Error::UnexpectedEof)?;

    let cap_bits = (u32::from(fixed.capability_flags_upper.get()) << 16)
        | u32::from(fixed.capability_flags_lower.get());
    let capability_flags = CapabilityFlags::from_bits_truncate(cap_bits);

    let (_reserved, rest) = read_string_fix(rest, 10)?;

    // Part 2 is max(13, auth_data_len - 8) bytes, the last of which is a NUL
    let auth_data_2_len = usize::from(fixed.auth_data_len).saturating_sub(9).max(12);
    let (auth_data_2, rest) = read_string_fix(rest, auth_data_2_len)?;
    let (_nul, rest) = read_int_1(rest)?;

    let mut auth_plugin_data = Vec::with_capacity(20);
    auth_plugin_data.extend_from_slice(&fixed.auth_data_part1);
    auth_plugin_data.extend_from_slice(auth_data_2);

    // Some servers omit the NUL after the plugin name
    let auth_plugin_name = match read_string_null(rest) {
        Ok((name, _rest)) => name,
        Err(_) => rest,
    };

    Ok(InitialHandshake {
        protocol_version,
        server_version,
        connection_id: fixed.connection_id.get(),
        auth_plugin_data,
        capability_flags,
        charset: fixed.charset,
        status_flags: ServerStatusFlags::from_bits_truncate(fixed.status_flags.get()),
        auth_plugin_name: String::from_utf8_lossy(auth_plugin_name).into_owned(),
    })
}

/// Handshake response packet sent by client (HandshakeResponse41)
#[derive(Debug, Clone)]
pub struct HandshakeResponse41<'a> {
    pub capability_flags: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: Option<&'a str>,
}

/// Write handshake response packet (HandshakeResponse41)
pub fn write_handshake_response(out: &mut Vec<u8>, response: &HandshakeResponse41) {
    write_int_4(out, response.capability_flags.bits());
    write_int_4(out, response.max_packet_size);
    write_int_1(out, response.charset);
    out.extend_from_slice(&[0u8; 23]);

    write_string_null(out, response.username);

    if response
        .capability_flags
        .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
    {
        write_bytes_lenenc(out, response.auth_response);
    } else {
        // Scrambles are at most 32 bytes
        write_int_1(out, response.auth_response.len() as u8);
        out.extend_from_slice(response.auth_response);
    }

    if let Some(db) = response.database
        && response
            .capability_flags
            .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
    {
        write_string_null(out, db);
    }

    if let Some(plugin) = response.auth_plugin_name
        && response
            .capability_flags
            .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH)
    {
        write_string_null(out, plugin);
    }
}

/// Auth switch request from server
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest<'a> {
    pub plugin_name: &'a [u8],
    pub plugin_data: &'a [u8],
}

/// Read auth switch request (0xFE followed by the plugin name and its data)
pub fn read_auth_switch_request(payload: &[u8]) -> Result<AuthSwitchRequest<'_>> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }

    let (plugin_name, data) = read_string_null(data)?;
    let plugin_data = data.strip_suffix(&[0]).unwrap_or(data);
    Ok(AuthSwitchRequest {
        plugin_name,
        plugin_data,
    })
}

// ============================================================================
// Authentication Plugins
// ============================================================================

/// mysql_native_password authentication
///
/// Formula: SHA1(password) XOR SHA1(challenge + SHA1(SHA1(password)))
pub fn auth_mysql_native_password(password: &str, challenge: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    let stage1_hash = Sha1::digest(password.as_bytes());
    let stage2_hash = Sha1::digest(stage1_hash);

    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2_hash);
    let token_hash = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(stage1_hash.iter().zip(token_hash.iter())) {
        *out = a ^ b;
    }
    result
}

/// caching_sha2_password authentication - initial response
///
/// Formula: SHA256(password) XOR SHA256(SHA256(SHA256(password)) + challenge)
pub fn auth_caching_sha2_password(password: &str, challenge: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(challenge);
    let scramble = hasher.finalize();

    let mut result = [0u8; 32];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(scramble.iter())) {
        *out = a ^ b;
    }
    result
}

/// Compute the first auth response for `plugin`
///
/// An empty password always produces an empty response. `mysql_clear_password` sends the
/// password itself and is refused unless the stream is encrypted.
pub fn auth_response(plugin: &[u8], password: &str, scramble: &[u8], tls: bool) -> Result<Vec<u8>> {
    let response = match plugin {
        _ if password.is_empty() => Vec::new(),
        b"mysql_native_password" => auth_mysql_native_password(password, scramble).to_vec(),
        b"caching_sha2_password" => auth_caching_sha2_password(password, scramble).to_vec(),
        b"mysql_clear_password" if tls => clear_password(password),
        plugin => {
            return Err(Error::UnsupportedAuthPlugin(
                String::from_utf8_lossy(plugin).into_owned(),
            ));
        }
    };
    Ok(response)
}

fn clear_password(password: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(password.len() + 1);
    write_string_null(&mut out, password);
    out
}

/// caching_sha2_password result carried by an AuthMoreData (0x01) packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachingSha2PasswordFastAuthResult {
    Success,
    FullAuthRequired,
}

/// Read caching_sha2_password fast auth result
pub fn read_caching_sha2_password_fast_auth_result(
    payload: &[u8],
) -> Result<CachingSha2PasswordFastAuthResult> {
    match payload {
        [0x01, 0x03] => Ok(CachingSha2PasswordFastAuthResult::Success),
        [0x01, 0x04] => Ok(CachingSha2PasswordFastAuthResult::FullAuthRequired),
        _ => Err(Error::InvalidPacket),
    }
}

// ============================================================================
// State Machine API for Handshake
// ============================================================================

/// Configuration for handshake
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub capabilities: CapabilityFlags,
    /// Collation id sent in the handshake response
    pub charset: u8,
    pub tls: bool,
}

/// Result of driving the handshake state machine
#[derive(Debug)]
pub enum HandshakeResult {
    /// Initial handshake received. Write the response to the server.
    InitialHandshake {
        handshake_response: Vec<u8>,
        initial_handshake: InitialHandshake,
    },
    /// Write the SSL request, upgrade the stream to TLS, then call `drive_after_tls()`
    SslRequest {
        ssl_request: Vec<u8>,
        initial_handshake: InitialHandshake,
    },
    /// Write this packet to the server, then read the next one
    Write(Vec<u8>),
    /// Read the next packet without writing anything
    NeedPacket,
    /// Handshake complete, connection established
    Connected {
        capability_flags: CapabilityFlags,
        status_flags: ServerStatusFlags,
    },
}

/// State machine for MySQL handshake
///
/// Pure parsing and packet generation state machine without I/O dependencies.
#[derive(Debug)]
pub enum Handshake {
    /// Waiting for initial handshake from server
    Start { config: HandshakeConfig },
    /// Sent SSL request, waiting for TLS upgrade to complete before sending handshake response
    WaitingTlsUpgrade {
        config: HandshakeConfig,
        auth_plugin_name: Vec<u8>,
        auth_plugin_data: Vec<u8>,
        capability_flags: CapabilityFlags,
    },
    /// Sent handshake response, waiting for auth result
    WaitingAuthResult {
        config: HandshakeConfig,
        plugin: Vec<u8>,
        capability_flags: CapabilityFlags,
    },
    /// Sent an auth switch response or the full caching_sha2 password, waiting for OK
    WaitingFinalAuthResult { capability_flags: CapabilityFlags },
    /// Connected (terminal state)
    Connected,
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self::Start { config }
    }

    /// Drive the state machine with the next payload
    pub fn drive(&mut self, payload: &[u8]) -> Result<HandshakeResult> {
        match std::mem::replace(self, Self::Connected) {
            Self::Start { config } => self.on_initial_handshake(config, payload),

            Self::WaitingAuthResult {
                config,
                plugin,
                capability_flags,
            } => match payload.first() {
                Some(0x00) => self.on_auth_ok(capability_flags, payload),
                Some(0xFF) => Err(auth_error(payload)),
                Some(0x01) if plugin == b"caching_sha2_password" => {
                    match read_caching_sha2_password_fast_auth_result(payload)? {
                        CachingSha2PasswordFastAuthResult::Success => {
                            *self = Self::WaitingFinalAuthResult { capability_flags };
                            Ok(HandshakeResult::NeedPacket)
                        }
                        CachingSha2PasswordFastAuthResult::FullAuthRequired if config.tls => {
                            *self = Self::WaitingFinalAuthResult { capability_flags };
                            Ok(HandshakeResult::Write(clear_password(&config.password)))
                        }
                        CachingSha2PasswordFastAuthResult::FullAuthRequired => {
                            Err(Error::UnsupportedAuthPlugin(
                                "caching_sha2_password full authentication requires TLS"
                                    .to_string(),
                            ))
                        }
                    }
                }
                Some(0xFE) => {
                    let auth_switch = read_auth_switch_request(payload)?;
                    tracing::debug!(
                        plugin = %String::from_utf8_lossy(auth_switch.plugin_name),
                        "auth switch"
                    );
                    let response = auth_response(
                        auth_switch.plugin_name,
                        &config.password,
                        auth_switch.plugin_data,
                        config.tls,
                    )?;
                    // caching_sha2_password may still answer with AuthMoreData
                    *self = Self::WaitingAuthResult {
                        plugin: auth_switch.plugin_name.to_vec(),
                        config,
                        capability_flags,
                    };
                    Ok(HandshakeResult::Write(response))
                }
                _ => Err(Error::InvalidPacket),
            },

            Self::WaitingFinalAuthResult { capability_flags } => match payload.first() {
                Some(0x00) => self.on_auth_ok(capability_flags, payload),
                Some(0xFF) => Err(auth_error(payload)),
                _ => Err(Error::InvalidPacket),
            },

            state @ Self::WaitingTlsUpgrade { .. } => {
                *self = state;
                Err(Error::SequenceError(
                    "call drive_after_tls() once the stream is encrypted",
                ))
            }

            Self::Connected => Err(Error::SequenceError("the handshake has already completed")),
        }
    }

    fn on_initial_handshake(
        &mut self,
        config: HandshakeConfig,
        payload: &[u8],
    ) -> Result<HandshakeResult> {
        let handshake = read_initial_handshake(payload)?;
        let server_caps = handshake.capability_flags;
        if !server_caps.contains(CapabilityFlags::CLIENT_PROTOCOL_41) {
            return Err(Error::Unsupported(
                "server does not support protocol 4.1".to_string(),
            ));
        }

        let mut client_caps =
            CAPABILITIES_ALWAYS_ENABLED | (config.capabilities & CAPABILITIES_CONFIGURABLE);
        if config.database.is_some() {
            client_caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
        }
        if config.tls {
            client_caps |= CapabilityFlags::CLIENT_SSL;
        }
        let capability_flags = client_caps & server_caps;
        tracing::debug!(
            server_version = %handshake.server_version,
            connection_id = handshake.connection_id,
            plugin = %handshake.auth_plugin_name,
            ?capability_flags,
            "initial handshake"
        );

        if config.tls {
            if !capability_flags.contains(CapabilityFlags::CLIENT_SSL) {
                return Err(Error::BadConfigError(
                    "TLS was requested but the server does not support it".to_string(),
                ));
            }
            let mut ssl_request = Vec::with_capacity(32);
            write_ssl_request(&mut ssl_request, capability_flags, config.charset);
            *self = Self::WaitingTlsUpgrade {
                auth_plugin_name: handshake.auth_plugin_name.as_bytes().to_vec(),
                auth_plugin_data: handshake.auth_plugin_data.clone(),
                config,
                capability_flags,
            };
            return Ok(HandshakeResult::SslRequest {
                ssl_request,
                initial_handshake: handshake,
            });
        }

        let handshake_response = self.respond(
            config,
            handshake.auth_plugin_name.as_bytes(),
            &handshake.auth_plugin_data,
            capability_flags,
        )?;
        Ok(HandshakeResult::InitialHandshake {
            handshake_response,
            initial_handshake: handshake,
        })
    }

    /// Build the HandshakeResponse41 and move to `WaitingAuthResult`
    fn respond(
        &mut self,
        config: HandshakeConfig,
        plugin: &[u8],
        scramble: &[u8],
        capability_flags: CapabilityFlags,
    ) -> Result<Vec<u8>> {
        let auth_response = auth_response(plugin, &config.password, scramble, config.tls)?;
        let plugin_name = std::str::from_utf8(plugin).map_err(Error::from_debug)?;

        let mut out = Vec::new();
        write_handshake_response(
            &mut out,
            &HandshakeResponse41 {
                capability_flags,
                max_packet_size: MAX_PACKET_SIZE,
                charset: config.charset,
                username: &config.username,
                auth_response: &auth_response,
                database: config.database.as_deref(),
                auth_plugin_name: Some(plugin_name),
            },
        );

        *self = Self::WaitingAuthResult {
            config,
            plugin: plugin.to_vec(),
            capability_flags,
        };
        Ok(out)
    }

    fn on_auth_ok(
        &mut self,
        capability_flags: CapabilityFlags,
        payload: &[u8],
    ) -> Result<HandshakeResult> {
        let ok = OkPayload::try_from(OkPayloadBytes(payload))?;
        *self = Self::Connected;
        Ok(HandshakeResult::Connected {
            capability_flags,
            status_flags: ok.status_flags,
        })
    }

    /// Continue handshake after TLS upgrade is complete.
    /// Call this after receiving SslRequest result and upgrading the connection to TLS.
    pub fn drive_after_tls(&mut self) -> Result<HandshakeResult> {
        match std::mem::replace(self, Self::Connected) {
            Self::WaitingTlsUpgrade {
                config,
                auth_plugin_name,
                auth_plugin_data,
                capability_flags,
            } => {
                let response =
                    self.respond(config, &auth_plugin_name, &auth_plugin_data, capability_flags)?;
                Ok(HandshakeResult::Write(response))
            }
            other => {
                *self = other;
                Err(Error::SequenceError("the handshake is not waiting for TLS"))
            }
        }
    }
}

fn auth_error(payload: &[u8]) -> Error {
    match ErrPayload::try_from(ErrPayloadBytes(payload)) {
        Ok(err) => Error::AuthError(err),
        Err(err) => err,
    }
}
