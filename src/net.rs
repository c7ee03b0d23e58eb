use axum::http::HeaderMap;
use std::net::IpAddr;

/// Определяет публичный IP клиента. Идем по цепочке X-Forwarded-For слева
/// направо и берем первый адрес, который парсится и не является приватным
/// или loopback; если такого нет — возвращаем адрес соединения.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        for entry in forwarded.split(',') {
            if let Ok(ip) = entry.trim().parse::<IpAddr>() {
                if is_public(ip) {
                    return ip;
                }
            }
        }
    }

    peer
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified())
        }
        IpAddr::V6(v6) => {
            // fc00::/7 — unique local, аналог приватных диапазонов IPv4;
            // fe80::/10 — link-local.
            let is_unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let is_link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || is_unique_local || is_link_local)
        }
    }
}
