//! Icon lookup for services, images, and operating systems.

/// Ordered `(key, url)` icon table. Exact name matches win, then the first
/// substring hit against the image, then against the name.
const ICONS: &[(&str, &str)] = &[
    // Databases
    ("postgres", "https://icons.terrastruct.com/dev/postgresql.svg"),
    ("postgresql", "https://icons.terrastruct.com/dev/postgresql.svg"),
    ("mysql", "https://icons.terrastruct.com/dev/mysql.svg"),
    ("mariadb", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/mariadb.svg"),
    ("redis", "https://icons.terrastruct.com/dev/redis.svg"),
    ("mongodb", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/mongodb.svg"),
    ("mongo", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/mongodb.svg"),
    ("couchdb", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/couchdb.svg"),
    // Web / proxy
    ("nginx-proxy-manager", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/nginx-proxy-manager.svg"),
    ("npm", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/nginx-proxy-manager.svg"),
    ("nginx", "https://icons.terrastruct.com/dev/nginx.svg"),
    ("traefik", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/traefik.svg"),
    ("caddy", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/caddy.svg"),
    ("cloudflare", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/cloudflare.svg"),
    // Monitoring
    ("netdata", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/netdata.svg"),
    ("grafana", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/grafana.svg"),
    ("prometheus", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/prometheus.svg"),
    ("uptime-kuma", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/uptime-kuma.svg"),
    // Containers
    ("docker", "https://icons.terrastruct.com/dev/docker.svg"),
    ("portainer", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/portainer.svg"),
    // Languages / frameworks
    ("nodejs", "https://icons.terrastruct.com/dev/nodejs.svg"),
    ("node", "https://icons.terrastruct.com/dev/nodejs.svg"),
    ("go", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/golang.svg"),
    ("python", "https://icons.terrastruct.com/dev/python.svg"),
    // Infrastructure
    ("tailscale", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/tailscale.svg"),
    ("cockpit", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/cockpit.svg"),
    ("kubernetes", "https://icons.terrastruct.com/dev/kubernetes.svg"),
    ("k8s", "https://icons.terrastruct.com/dev/kubernetes.svg"),
    ("proxmox", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/proxmox.svg"),
    ("terraform", "https://icons.terrastruct.com/dev/terraform.svg"),
    // Operating systems
    ("linux", "https://icons.terrastruct.com/dev/linux.svg"),
    ("debian", "https://icons.terrastruct.com/dev/debian.svg"),
    ("macos", "https://icons.terrastruct.com/dev/apple.svg"),
    ("ios", "https://icons.terrastruct.com/dev/apple.svg"),
    ("android", "https://icons.terrastruct.com/dev/android.svg"),
    ("windows", "https://icons.terrastruct.com/dev/windows.svg"),
    // Media
    ("plex", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/plex.svg"),
    ("jellyfin", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/jellyfin.svg"),
    ("jellyseerr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/jellyseerr.svg"),
    ("radarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/radarr.svg"),
    ("sonarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/sonarr.svg"),
    ("prowlarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/prowlarr.svg"),
    ("bazarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/bazarr.svg"),
    ("overseerr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/overseerr.svg"),
    ("tautulli", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/tautulli.svg"),
    // Downloads
    ("transmission", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/transmission.svg"),
    ("qbittorrent", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/qbittorrent.svg"),
    ("sabnzbd", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/sabnzbd.svg"),
    ("gluetun", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/gluetun.svg"),
    // Tools
    ("vaultwarden", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/vaultwarden.svg"),
    ("bitwarden", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/bitwarden.svg"),
    ("homepage", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/homepage.svg"),
    ("homarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/homarr.svg"),
    ("home-assistant", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/home-assistant.svg"),
    ("homeassistant", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/home-assistant.svg"),
    ("stirling-pdf", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/stirling-pdf.svg"),
    ("it-tools", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/it-tools.svg"),
    // Self-hosted services
    ("n8n", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/n8n.svg"),
    ("gitea", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/gitea.svg"),
    ("vikunja", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/vikunja.svg"),
    ("ntfy", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/ntfy.svg"),
    ("semaphore", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/semaphore.svg"),
    ("kiwix", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/kiwix.svg"),
    ("audiobookshelf", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/audiobookshelf.svg"),
    ("recyclarr", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/recyclarr.svg"),
    ("super-productivity", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/super-productivity.svg"),
    ("obsidian", "https://cdn.jsdelivr.net/gh/selfhst/icons/svg/obsidian.svg"),
];

/// Icon URL for a service: exact name match first, then substring match
/// against the image, then against the name. First hit wins.
pub fn lookup_icon(name: &str, image: &str) -> Option<&'static str> {
    let name_lower = name.to_lowercase();
    for (key, url) in ICONS {
        if *key == name_lower {
            return Some(url);
        }
    }

    let image_lower = image.to_lowercase();
    if !image_lower.is_empty() {
        for (key, url) in ICONS {
            if image_lower.contains(key) {
                return Some(url);
            }
        }
    }

    for (key, url) in ICONS {
        if name_lower.contains(key) {
            return Some(url);
        }
    }

    None
}

/// Icon URL for an OS string, by substring match.
pub fn lookup_os_icon(os: &str) -> Option<&'static str> {
    let os_lower = os.to_lowercase();
    if os_lower.is_empty() {
        return None;
    }
    ICONS
        .iter()
        .find(|(key, _)| os_lower.contains(key))
        .map(|(_, url)| *url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_name_match_wins() {
        assert_eq!(
            lookup_icon("postgres", "some/image"),
            Some("https://icons.terrastruct.com/dev/postgresql.svg")
        );
    }

    #[test]
    fn test_image_substring_beats_name_substring() {
        // Name only matches via substring, image matches first.
        assert_eq!(
            lookup_icon("my-db", "library/redis:7"),
            Some("https://icons.terrastruct.com/dev/redis.svg")
        );
    }

    #[test]
    fn test_name_substring_fallback() {
        assert_eq!(
            lookup_icon("gitea-runner", ""),
            Some("https://cdn.jsdelivr.net/gh/selfhst/icons/svg/gitea.svg")
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(lookup_icon("mystery", "mystery:1"), None);
        assert_eq!(lookup_os_icon(""), None);
    }

    #[test]
    fn test_os_icons() {
        assert_eq!(
            lookup_os_icon("Linux 6.1"),
            Some("https://icons.terrastruct.com/dev/linux.svg")
        );
        assert_eq!(
            lookup_os_icon("iOS"),
            Some("https://icons.terrastruct.com/dev/apple.svg")
        );
    }
}
