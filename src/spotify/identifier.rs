/// Normalize a user-supplied playlist reference to the bare playlist id.
///
/// Accepted forms:
/// - bare id: `37i9dQZF1DXcBWIGoYBM5M`
/// - URI: `spotify:playlist:37i9dQZF1DXcBWIGoYBM5M`
/// - URL: `https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=xyz`
///
/// A trailing query string and surrounding whitespace are stripped.
pub fn parse_playlist_identifier(identifier: &str) -> String {
    let identifier = identifier.trim();

    let id = if identifier.contains("spotify.com/playlist") {
        identifier.rsplit('/').next().unwrap_or(identifier)
    } else if identifier.contains("spotify:playlist") {
        identifier.rsplit(':').next().unwrap_or(identifier)
    } else {
        identifier
    };

    id.split('?').next().unwrap_or(id).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        assert_eq!(parse_playlist_identifier("ABC123"), "ABC123");
    }

    #[test]
    fn test_uri() {
        assert_eq!(parse_playlist_identifier("spotify:playlist:ABC123"), "ABC123");
    }

    #[test]
    fn test_url_with_query() {
        assert_eq!(
            parse_playlist_identifier("https://open.spotify.com/playlist/ABC123?si=xyz"),
            "ABC123"
        );
    }

    #[test]
    fn test_url_without_query() {
        assert_eq!(
            parse_playlist_identifier("https://open.spotify.com/playlist/ABC123"),
            "ABC123"
        );
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(
            parse_playlist_identifier("  spotify:playlist:ABC123\n"),
            "ABC123"
        );
    }

    #[test]
    fn test_bare_id_with_query() {
        assert_eq!(parse_playlist_identifier("ABC123?si=xyz"), "ABC123");
    }
}
