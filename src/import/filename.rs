use super::ContentCategory;

/// Extension of every imported primary image.
pub const POSTER_EXTENSION: &str = "jpg";

/// Strips everything but alphanumerics, whitespace, `_`, `-` and `.`, then
/// collapses whitespace runs to one space and trims the ends.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-' | '.'))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// File stem for an imported poster. Same inputs always give the same stem,
/// which is what lets a re-import find its previous file.
fn poster_stem(title: &str, id: &str, category: ContentCategory, provider_label: &str) -> String {
    let mut stem = sanitize_title(title);

    if !id.is_empty() {
        stem.push_str(&format!(" [{}]", id));
    }

    if category == ContentCategory::Collections {
        stem.push_str(&format!(" Collection {}", provider_label));
    } else {
        stem.push_str(&format!(" {}", provider_label));
    }

    stem.trim().to_string()
}

pub fn generate_filename(
    title: &str,
    id: &str,
    extension: &str,
    category: ContentCategory,
    provider_label: &str,
) -> String {
    format!(
        "{}.{}",
        poster_stem(title, id, category, provider_label),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_is_stripped() {
        let name = generate_filename("Test: Movie?", "42", "jpg", ContentCategory::Movies, "X");
        assert_eq!(name, "Test Movie [42] X.jpg");
    }

    #[test]
    fn test_collection_suffix() {
        let name = generate_filename(
            "Alien",
            "abc",
            "jpg",
            ContentCategory::Collections,
            "Jellyfin",
        );
        assert_eq!(name, "Alien [abc] Collection Jellyfin.jpg");
    }

    #[test]
    fn test_empty_id_omits_brackets() {
        let name = generate_filename("Up", "", "jpg", ContentCategory::Shows, "Plex");
        assert_eq!(name, "Up Plex.jpg");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(sanitize_title("  The   Office\t(US) "), "The Office US");
        assert_eq!(sanitize_title("Mr. Robot - S1_x"), "Mr. Robot - S1_x");
        assert_eq!(sanitize_title("Amélie"), "Amélie");
    }

    #[test]
    fn test_providers_do_not_collide() {
        let a = generate_filename("Heat", "7", "jpg", ContentCategory::Movies, "Plex");
        let b = generate_filename("Heat", "7", "jpg", ContentCategory::Movies, "Jellyfin");
        assert_ne!(a, b);
        assert_eq!(
            a,
            generate_filename("Heat", "7", "jpg", ContentCategory::Movies, "Plex")
        );
    }
}
