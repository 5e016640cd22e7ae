// Save path mapping (filename -> container + blob)

pub const DEFAULT_CONTAINER: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveLocation {
    pub container: String,
    pub blob: String,
}

/// Map a save filename onto a container and blob.
///
/// `dir/file` becomes container `dir`, blob `file`; a bare name lands in
/// the default container. In UWP compatibility mode the whole path is the
/// blob name inside the default container.
pub fn locate(filename: &str, uwp_compatibility: bool) -> SaveLocation {
    let normalised = filename.replace('\\', "/");
    let normalised = normalised.trim_start_matches('/');

    if uwp_compatibility {
        return SaveLocation {
            container: DEFAULT_CONTAINER.to_string(),
            blob: normalised.to_string(),
        };
    }

    match normalised.rsplit_once('/') {
        Some((dir, file)) if !dir.is_empty() => SaveLocation {
            container: dir.to_string(),
            blob: file.to_string(),
        },
        Some((_, file)) => SaveLocation {
            container: DEFAULT_CONTAINER.to_string(),
            blob: file.to_string(),
        },
        None => SaveLocation {
            container: DEFAULT_CONTAINER.to_string(),
            blob: normalised.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_last_separator() {
        let loc = locate("saves/slot1/data.sav", false);
        assert_eq!(loc.container, "saves/slot1");
        assert_eq!(loc.blob, "data.sav");

        let loc = locate("saves\\data.sav", false);
        assert_eq!(loc.container, "saves");
        assert_eq!(loc.blob, "data.sav");
    }

    #[test]
    fn test_bare_name_uses_default_container() {
        let loc = locate("options.ini", false);
        assert_eq!(loc.container, DEFAULT_CONTAINER);
        assert_eq!(loc.blob, "options.ini");
    }

    #[test]
    fn test_uwp_compatibility_keeps_full_path() {
        let loc = locate("saves/slot1/data.sav", true);
        assert_eq!(loc.container, DEFAULT_CONTAINER);
        assert_eq!(loc.blob, "saves/slot1/data.sav");
    }
}
