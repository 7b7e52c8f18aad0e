mod common;

mod admission_handshake;
mod chat_broadcast;
mod three_peer_audio_fan_out;
