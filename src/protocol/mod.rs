//! Wire-level constants and the tag vocabulary shared by requests and
//! responses.

pub mod query;
pub mod request;
pub mod response;
pub mod tokenizer;

/// Protocol version advertised in the connection greeting.
pub const PROTOCOL_VERSION: &str = "0.24.0";

pub fn greeting() -> String {
    format!("OK MPD {PROTOCOL_VERSION}\n")
}

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Metadata tag names, mirroring the fixed vocabulary clients negotiate with
/// `tagtypes`/`Command::Find`/`Command::List` filters.
#[derive(
    Deserialize,
    Serialize,
    Display,
    EnumIter,
    EnumString,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
)]
pub enum Tag {
    #[default]
    Artist,
    ArtistSort,
    Album,
    AlbumSort,
    AlbumArtist,
    AlbumArtistSort,
    Title,
    TitleSort,
    Track,
    Name,
    Genre,
    Mood,
    Date,
    OriginalDate,
    Composer,
    ComposerSort,
    Performer,
    Conductor,
    Work,
    Ensemble,
    Movement,
    MovementNumber,
    ShowMovement,
    Location,
    Grouping,
    Comment,
    Disc,
    Label,
    MusicbrainzArtistId,
    MusicbrainzAlbumId,
    MusicbrainzAlbumArtistId,
    MusicbrainzTrackId,
    MusicbrainzReleasegroupId,
    MusicbrainzReleaseTrackId,
    MusicbrainzWorkId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_matches_wire_format() {
        assert_eq!(greeting(), "OK MPD 0.24.0\n");
    }
}
