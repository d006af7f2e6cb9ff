use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionType {
    #[default]
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionType {
    pub const ALL: [ReactionType; 6] = [
        ReactionType::Like,
        ReactionType::Love,
        ReactionType::Haha,
        ReactionType::Wow,
        ReactionType::Sad,
        ReactionType::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "LIKE",
            ReactionType::Love => "LOVE",
            ReactionType::Haha => "HAHA",
            ReactionType::Wow => "WOW",
            ReactionType::Sad => "SAD",
            ReactionType::Angry => "ANGRY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LIKE" => Some(ReactionType::Like),
            "LOVE" => Some(ReactionType::Love),
            "HAHA" => Some(ReactionType::Haha),
            "WOW" => Some(ReactionType::Wow),
            "SAD" => Some(ReactionType::Sad),
            "ANGRY" => Some(ReactionType::Angry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Friends => "FRIENDS",
            Visibility::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PUBLIC" => Some(Visibility::Public),
            "FRIENDS" => Some(Visibility::Friends),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_parse_is_case_insensitive() {
        assert_eq!(ReactionType::parse("love"), Some(ReactionType::Love));
        assert_eq!(ReactionType::parse("HaHa"), Some(ReactionType::Haha));
        assert_eq!(ReactionType::parse("meh"), None);
    }

    #[test]
    fn test_reaction_wire_names_match_as_str() {
        for reaction in ReactionType::ALL {
            let json = serde_json::to_string(&reaction).unwrap();
            assert_eq!(json, format!("\"{}\"", reaction.as_str()));
        }
    }

    #[test]
    fn test_visibility_round_trips_through_parse() {
        for visibility in [Visibility::Public, Visibility::Friends, Visibility::Private] {
            assert_eq!(Visibility::parse(visibility.as_str()), Some(visibility));
        }
    }
}
