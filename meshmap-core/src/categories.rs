//! Service categorization: maps well-known service/image names to
//! presentation categories used for visual grouping.

/// Ordered `(pattern, category)` table. Exact name matches are tried first,
/// then the first substring hit over the combined name+image string wins, so
/// the slice order is the precedence order.
pub const CATEGORY_PATTERNS: &[(&str, &str)] = &[
    // Databases
    ("postgres", "database"),
    ("postgresql", "database"),
    ("mysql", "database"),
    ("mariadb", "database"),
    ("mongo", "database"),
    ("redis", "database"),
    ("influxdb", "database"),
    ("memcached", "database"),
    ("couchdb", "database"),
    // Media
    ("plex", "media"),
    ("jellyfin", "media"),
    ("jellyseerr", "media"),
    ("radarr", "media"),
    ("sonarr", "media"),
    ("prowlarr", "media"),
    ("bazarr", "media"),
    ("overseerr", "media"),
    ("tautulli", "media"),
    ("emby", "media"),
    ("kodi", "media"),
    // Downloads
    ("transmission", "downloads"),
    ("qbittorrent", "downloads"),
    ("sabnzbd", "downloads"),
    ("gluetun", "downloads"),
    ("nzbget", "downloads"),
    ("deluge", "downloads"),
    ("aria2", "downloads"),
    // Infrastructure
    ("traefik", "infrastructure"),
    ("nginx-proxy-manager", "infrastructure"),
    ("nginx", "infrastructure"),
    ("caddy", "infrastructure"),
    ("portainer", "infrastructure"),
    ("docker", "infrastructure"),
    ("watchtower", "infrastructure"),
    // Monitoring
    ("netdata", "monitoring"),
    ("grafana", "monitoring"),
    ("prometheus", "monitoring"),
    ("uptime-kuma", "monitoring"),
    ("cockpit", "monitoring"),
    // Tools
    ("stirling-pdf", "tools"),
    ("it-tools", "tools"),
    ("homepage", "tools"),
    ("homarr", "tools"),
    ("dashy", "tools"),
    // Productivity
    ("vikunja", "productivity"),
    ("n8n", "productivity"),
    ("super-productivity", "productivity"),
    // Dev
    ("gitea", "dev"),
    ("gitlab", "dev"),
    ("forgejo", "dev"),
    ("semaphore", "dev"),
    // Home
    ("home-assistant", "home"),
    ("homeassistant", "home"),
    // Security
    ("vaultwarden", "security"),
    ("bitwarden", "security"),
    ("authelia", "security"),
    // Communication
    ("ntfy", "communication"),
];

/// Determine the category for a service from its name and image reference.
/// Returns an empty string when nothing matches.
pub fn categorize(name: &str, image: &str) -> String {
    let name_lower = name.to_lowercase();

    for (pattern, category) in CATEGORY_PATTERNS {
        if *pattern == name_lower {
            return (*category).to_string();
        }
    }

    let haystack = format!("{} {}", name_lower, image.to_lowercase());
    for (pattern, category) in CATEGORY_PATTERNS {
        if haystack.contains(pattern) {
            return (*category).to_string();
        }
    }

    String::new()
}
