use once_cell::sync::Lazy;
use regex_lite::Regex;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

/// Bare phone-number form of a JID or user-typed number.
///
/// `"62811-2233@s.whatsapp.net"`, `"+62 811 2233"` and `"628112233:12@s.whatsapp.net"`
/// all become `"628112233"`.
pub fn bare_number(id: &str) -> String {
    let user = id.split('@').next().unwrap_or(id);
    let user = user.split(':').next().unwrap_or(user);
    NON_DIGITS.replace_all(user, "").into_owned()
}

/// Participant of a group with its admin flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub jid: String,
    pub is_admin: bool,
}

/// Group metadata as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMetadata {
    pub id: String,
    pub subject: String,
    pub description: Option<String>,
    pub participants: Vec<Participant>,
}

impl GroupMetadata {
    pub fn is_admin(&self, jid: &str) -> bool {
        let number = bare_number(jid);
        self.participants
            .iter()
            .any(|p| p.is_admin && bare_number(&p.jid) == number)
    }

    pub fn admins(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_strips_server_device_and_punctuation() {
        assert_eq!(bare_number("628112233@s.whatsapp.net"), "628112233");
        assert_eq!(bare_number("628112233:12@s.whatsapp.net"), "628112233");
        assert_eq!(bare_number("+62 811-2233"), "628112233");
    }

    #[test]
    fn admin_lookup_ignores_device_suffix() {
        let meta = GroupMetadata {
            id: "1@g.us".into(),
            subject: "test".into(),
            description: None,
            participants: vec![
                Participant { jid: "111@s.whatsapp.net".into(), is_admin: true },
                Participant { jid: "222@s.whatsapp.net".into(), is_admin: false },
            ],
        };
        assert!(meta.is_admin("111:3@s.whatsapp.net"));
        assert!(!meta.is_admin("222@s.whatsapp.net"));
        assert_eq!(meta.admins().count(), 1);
    }
}
