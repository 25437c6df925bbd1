use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

/// Navigator and WebGL values presented to the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub languages: Vec<String>,
    pub vendor: String,
    pub platform: String,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self {
            languages: ["ru-RU", "ru", "en-US", "en"]
                .into_iter()
                .map(String::from)
                .collect(),
            vendor: "Google Inc.".to_string(),
            platform: "Win32".to_string(),
            webgl_vendor: "Intel Inc.".to_string(),
            webgl_renderer: "Intel Iris OpenGL Engine".to_string(),
            hardware_concurrency: 8,
            device_memory: 8,
        }
    }
}

impl Fingerprint {
    /// Default profile with per-session hardware values
    ///
    /// Twenty sessions reporting identical hardware is itself a signal.
    pub fn randomized() -> Self {
        let mut rng = rand::rng();
        let cores = [4_u32, 6, 8, 12, 16];
        let memory = [4_u32, 8, 16];
        Self {
            hardware_concurrency: *cores.choose(&mut rng).unwrap_or(&8),
            device_memory: *memory.choose(&mut rng).unwrap_or(&8),
            ..Self::default()
        }
    }

    /// `Accept-Language`-style header value with descending q-weights
    pub fn accept_language(&self) -> String {
        self.languages
            .iter()
            .enumerate()
            .map(|(i, lang)| {
                if i == 0 {
                    lang.clone()
                } else {
                    format!("{lang};q=0.{}", 10 - i.min(9))
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Small random offset so sessions do not share a screen size exactly
    pub fn jittered_viewport() -> (u32, u32) {
        let mut rng = rand::rng();
        (1920 - rng.random_range(0..=40), 1080 - rng.random_range(0..=40))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_presents_russian_desktop() {
        let fp = Fingerprint::default();
        assert_eq!(fp.languages, ["ru-RU", "ru", "en-US", "en"]);
        assert_eq!(fp.platform, "Win32");
        assert_eq!(fp.accept_language(), "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7");
    }

    #[test]
    fn randomized_keeps_identity_fields() {
        for _ in 0..20 {
            let fp = Fingerprint::randomized();
            assert_eq!(fp.vendor, "Google Inc.");
            assert!([4, 6, 8, 12, 16].contains(&fp.hardware_concurrency));
            assert!([4, 8, 16].contains(&fp.device_memory));
        }
    }
}
