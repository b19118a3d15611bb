use std::io::Write;

use memory_core::date::exif;
use memory_core::session::fit_within;
use memory_core::{Overlay, PhotoDisplay, PhotoRecord, Playback, PlaybackOutcome};

/// Prints the overlay and where the photo lives instead of drawing it.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    max_width: u32,
    max_height: u32,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, max_width: u32, max_height: u32) -> Self {
        Self {
            out,
            max_width,
            max_height,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PhotoDisplay for ConsoleDisplay<W> {
    fn show(&mut self, photo: &PhotoRecord, overlay: &Overlay) -> anyhow::Result<()> {
        writeln!(self.out, "  {}", overlay.headline())?;
        write!(self.out, "  {} (taken {})", photo.path.display(), overlay.captured)?;
        if let Some((w, h)) = exif::read_exif(&photo.path).and_then(|e| exif::pixel_dimensions(&e)) {
            let (fw, fh) = fit_within(w, h, self.max_width, self.max_height);
            write!(self.out, " {}x{}", fw, fh)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Prints an open.spotify.com link for the track instead of driving a
/// remote player.
pub struct LinkPlayback<W: Write> {
    out: W,
}

impl<W: Write> LinkPlayback<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Playback for LinkPlayback<W> {
    fn play(&mut self, uri: &str, position_ms: u64) -> anyhow::Result<PlaybackOutcome> {
        let Some(url) = open_url(uri) else {
            return Ok(PlaybackOutcome::DeviceUnavailable(format!(
                "cannot open {} outside a Spotify client",
                uri
            )));
        };
        let seconds = position_ms / 1000;
        writeln!(
            self.out,
            "  play {} from {}:{:02}",
            url,
            seconds / 60,
            seconds % 60
        )?;
        Ok(PlaybackOutcome::Started)
    }
}

/// `spotify:track:<id>` -> `https://open.spotify.com/track/<id>`
fn open_url(uri: &str) -> Option<String> {
    let mut parts = uri.split(':');
    if parts.next()? != "spotify" {
        return None;
    }
    let kind = parts.next()?;
    let id = parts.next()?;
    if !matches!(kind, "track" | "episode") || id.is_empty() || parts.next().is_some() {
        return None;
    }
    Some(format!("https://open.spotify.com/{}/{}", kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use memory_core::date::TimestampSource;
    use std::path::PathBuf;

    #[test]
    fn test_open_url() {
        assert_eq!(
            open_url("spotify:track:4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            open_url("spotify:episode:abc").as_deref(),
            Some("https://open.spotify.com/episode/abc")
        );
        assert!(open_url("spotify:local:a:b:c:1").is_none());
        assert!(open_url("https://example.com").is_none());
        assert!(open_url("spotify:track:").is_none());
    }

    #[test]
    fn test_link_playback() {
        let mut playback = LinkPlayback::new(Vec::new());
        assert_eq!(
            playback.play("spotify:track:abc", 90_000).unwrap(),
            PlaybackOutcome::Started
        );
        assert!(matches!(
            playback.play("spotify:local:x:y:z:3", 0).unwrap(),
            PlaybackOutcome::DeviceUnavailable(_)
        ));
        let out = String::from_utf8(playback.into_inner()).unwrap();
        assert_eq!(out, "  play https://open.spotify.com/track/abc from 1:30\n");
    }

    #[test]
    fn test_console_display() {
        let photo = PhotoRecord {
            path: PathBuf::from("/nonexistent/beach.jpg"),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(16, 45, 0).unwrap(),
            source: TimestampSource::Embedded,
        };
        let overlay = Overlay {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            captured: "2024-03-09 16:45".to_string(),
        };
        let mut display = ConsoleDisplay::new(Vec::new(), 1400, 900);
        display.show(&photo, &overlay).unwrap();
        let out = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(
            out,
            "  Song - Band\n  /nonexistent/beach.jpg (taken 2024-03-09 16:45)\n"
        );
    }
}
