//! WebRTC session handle capability interface. The ICE agent, DTLS, SRTP
//! and codec machinery live entirely behind this trait.
//!
//! [`PeerConnection`] exposes exactly the operations the Peer Session
//! state machine and the media relay need. The concrete implementation
//! is backed by the `webrtc` crate — the actively maintained pure-Rust
//! `RTCPeerConnection` — so the rest of the codebase never imports
//! `webrtc::*` directly.

use std::sync::Arc;

use aviary_client_api_proto::IceCandidate as WireIceCandidate;
use failure::Fail;
use tokio::sync::mpsc;
use webrtc::{
    api::{
        media_engine::MediaEngine, setting_engine::SettingEngine, APIBuilder,
    },
    ice_transport::{
        ice_candidate::RTCIceCandidateInit, ice_server::RTCIceServer,
    },
    peer_connection::{
        configuration::RTCConfiguration,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
    rtp_transceiver::rtp_codec::RTPCodecType,
    track::{
        track_local::{
            track_local_static_rtp::TrackLocalStaticRTP, TrackLocal,
        },
        track_remote::TrackRemote,
    },
};

use crate::{ice::IceServer, media::track::Sink};

#[derive(Debug, Fail)]
pub enum MediaError {
    #[fail(display = "webrtc error: {}", _0)]
    Webrtc(String),
}

impl From<webrtc::Error> for MediaError {
    fn from(e: webrtc::Error) -> Self {
        Self::Webrtc(e.to_string())
    }
}

/// A newly received inbound track, handed to `Room::on_track_started`.
pub struct InboundTrack {
    pub remote: Arc<TrackRemote>,
}

/// Capability interface for one peer's WebRTC session. Owned exclusively
/// by its `PeerSession`; no other session ever invokes methods on it.
#[async_trait::async_trait]
pub trait PeerConnection: Send + Sync {
    async fn set_remote_description(
        &self,
        sdp: String,
    ) -> Result<(), MediaError>;

    /// Creates an answer, applies it as the local description, and
    /// returns the *unpatched* SDP — the caller (`PeerSession`) is
    /// responsible for running `sdp::patch_audio_answer` before sending
    /// it to the client, keeping this capability interface ignorant of
    /// that server-side policy.
    async fn create_and_set_local_answer(&self) -> Result<String, MediaError>;

    async fn add_ice_candidate(
        &self,
        candidate: WireIceCandidate,
    ) -> Result<(), MediaError>;

    /// Attaches a [`Sink`] as a new outbound sender, forwarding its
    /// frames until the sink ends.
    async fn add_outbound_sink(&self, sink: Sink) -> Result<(), MediaError>;

    /// Stops every outbound sender previously attached via
    /// [`add_outbound_sink`].
    async fn stop_outbound_senders(&self) -> Result<(), MediaError>;

    async fn close(&self) -> Result<(), MediaError>;
}

/// `webrtc`-crate-backed [`PeerConnection`].
pub struct WebrtcPeerConnection {
    inner: Arc<RTCPeerConnection>,
    outbound: tokio::sync::Mutex<Vec<Arc<TrackLocalStaticRTP>>>,
}

impl WebrtcPeerConnection {
    /// Builds a new session, wiring its inbound-track callback to
    /// forward onto `on_track`, and returns a handle for it.
    pub async fn new(
        ice_servers: &[IceServer],
        on_track: mpsc::UnboundedSender<InboundTrack>,
    ) -> Result<Self, MediaError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(MediaError::from)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_setting_engine(SettingEngine::default())
            .build();

        let config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await?);

        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            if track.kind() == RTPCodecType::Audio {
                drop(on_track.send(InboundTrack {
                    remote: Arc::clone(&track),
                }));
            }
            Box::pin(async {})
        }));

        Ok(Self {
            inner: pc,
            outbound: tokio::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl PeerConnection for WebrtcPeerConnection {
    async fn set_remote_description(
        &self,
        sdp: String,
    ) -> Result<(), MediaError> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.inner.set_remote_description(desc).await?;
        Ok(())
    }

    async fn create_and_set_local_answer(&self) -> Result<String, MediaError> {
        let answer = self.inner.create_answer(None).await?;
        self.inner.set_local_description(answer.clone()).await?;
        Ok(answer.sdp)
    }

    async fn add_ice_candidate(
        &self,
        candidate: WireIceCandidate,
    ) -> Result<(), MediaError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.inner.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn add_outbound_sink(&self, mut sink: Sink) -> Result<(), MediaError> {
        let local = Arc::new(TrackLocalStaticRTP::new(
            webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability {
                mime_type: webrtc::api::media_engine::MIME_TYPE_OPUS
                    .to_owned(),
                ..Default::default()
            },
            format!("audio-{:?}", sink.track_id()),
            "aviary".to_owned(),
        ));

        self.inner.add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>).await?;
        self.outbound.lock().await.push(Arc::clone(&local));

        tokio::spawn(async move {
            while let Some(packet) = sink.next().await {
                if local.write_rtp(&packet).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    async fn stop_outbound_senders(&self) -> Result<(), MediaError> {
        self.outbound.lock().await.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.inner.close().await?;
        Ok(())
    }
}
