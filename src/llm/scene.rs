//! Scene descriptions that ground generated sentences in a concrete situation.
//!
//! Scenes are plain text files in `<config_dir>/scenes/`, one scene per
//! line, named after the topic (`travel_en.txt`, `everyday_life_en.txt`,
//! ...).  Lines may carry a `12→` numbering prefix, which is stripped.
//! Missing files simply mean no scene for that topic.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Topic;

/// Scenes per topic, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct SceneLibrary {
    scenes: HashMap<Topic, Vec<String>>,
}

impl SceneLibrary {
    /// Load every topic's scene file from `dir`.
    ///
    /// Unreadable files are logged and skipped; a missing directory yields
    /// an empty library.
    pub fn load(dir: &Path) -> Self {
        let mut scenes = HashMap::new();
        for topic in Topic::CONCRETE {
            let path = dir.join(file_name(topic));
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let lines = parse_scenes(&content);
                    log::debug!("scenes: {} from {}", lines.len(), path.display());
                    scenes.insert(topic, lines);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("scenes: cannot read {}: {e}", path.display()),
            }
        }
        Self { scenes }
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.values().all(Vec::is_empty)
    }

    /// A random scene for `topic`, if any are known.
    pub fn random<R: Rng + ?Sized>(&self, topic: Topic, rng: &mut R) -> Option<&str> {
        self.scenes
            .get(&topic)
            .and_then(|lines| lines.choose(rng))
            .map(String::as_str)
    }
}

/// Scene file for `topic`.  Technology shares the business scenes.
fn file_name(topic: Topic) -> &'static str {
    match topic {
        Topic::Travel => "travel_en.txt",
        Topic::Health => "health_en.txt",
        Topic::Entertainment => "entertainment_en.txt",
        Topic::Business | Topic::Technology => "business_en.txt",
        Topic::EverydayLife | Topic::Random => "everyday_life_en.txt",
    }
}

fn parse_scenes(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            match line[digits..].strip_prefix('→') {
                Some(rest) if digits > 0 => rest.trim().to_string(),
                _ => line.to_string(),
            }
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn numbering_prefix_is_stripped() {
        let scenes = parse_scenes("1→A busy train station\n\n  2→ A quiet café \nNo number here\n3 apples on a desk\n");
        assert_eq!(
            scenes,
            [
                "A busy train station",
                "A quiet café",
                "No number here",
                "3 apples on a desk"
            ]
        );
    }

    #[test]
    fn load_reads_topic_files_and_shares_business() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("travel_en.txt"), "1→Lost luggage desk\n").unwrap();
        std::fs::write(dir.path().join("business_en.txt"), "Quarterly review\n").unwrap();

        let library = SceneLibrary::load(dir.path());
        let mut rng = StdRng::seed_from_u64(3);

        assert!(!library.is_empty());
        assert_eq!(library.random(Topic::Travel, &mut rng), Some("Lost luggage desk"));
        assert_eq!(library.random(Topic::Technology, &mut rng), Some("Quarterly review"));
        assert_eq!(library.random(Topic::Health, &mut rng), None);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let library = SceneLibrary::load(&dir.path().join("nope"));
        assert!(library.is_empty());
        assert_eq!(library.random(Topic::Travel, &mut rand::thread_rng()), None);
    }
}
