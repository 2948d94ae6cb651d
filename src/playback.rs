//! Playback source resolution for the player screen.
//!
//! Every movie currently resolves to the same Widevine-protected DASH test
//! stream; the catalog id is carried along but does not select the media.
//! Decoding and DRM session handling belong to the player, not this crate.

use crate::catalog::Movie;
use serde::Serialize;

const VOD_MANIFEST_URL: &str = "https://storage.googleapis.com/wvmedia/cenc/h264/tears/tears.mpd";
const DRM_LICENSE_URL: &str =
    "https://proxy.uat.widevine.com/proxy?video_id=2015_tears&provider=widevine_test";

/// Content protection system expected by the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrmScheme {
    Widevine,
}

impl DrmScheme {
    /// DASH `ContentProtection@schemeIdUri` system id.
    pub const fn system_id(self) -> &'static str {
        match self {
            DrmScheme::Widevine => "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed",
        }
    }
}

/// Everything a player needs to open a protected stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSource {
    pub movie_id: u64,
    pub manifest_url: &'static str,
    pub license_url: &'static str,
    pub drm: DrmScheme,
    /// Single DRM session per player; the Widevine test proxy rejects
    /// multi-session requests.
    pub multi_session: bool,
    pub autoplay: bool,
}

impl PlaybackSource {
    pub fn for_movie(movie: &Movie) -> Self {
        tracing::debug!(movie_id = movie.id, "Resolving playback source");
        Self {
            movie_id: movie.id,
            manifest_url: VOD_MANIFEST_URL,
            license_url: DRM_LICENSE_URL,
            drm: DrmScheme::Widevine,
            multi_session: false,
            autoplay: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_movie_gets_the_test_stream() {
        let a = PlaybackSource::for_movie(&Movie::new(1, "A"));
        let b = PlaybackSource::for_movie(&Movie::new(2, "B"));

        assert_eq!(a.movie_id, 1);
        assert_eq!(b.movie_id, 2);
        assert_eq!(a.manifest_url, b.manifest_url);
        assert!(a.manifest_url.ends_with(".mpd"));
        assert!(a.license_url.starts_with("https://"));
        assert_eq!(a.drm, DrmScheme::Widevine);
        assert!(!a.multi_session);
    }

    #[test]
    fn test_widevine_system_id() {
        assert_eq!(
            DrmScheme::Widevine.system_id(),
            "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed"
        );
    }
}
