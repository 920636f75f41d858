use serde::Deserialize;

/// Bitmask of physical states. Used both for what an object *is* and for
/// what it *blocks*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct Matter(pub u8);

impl Matter {
    pub const NONE: Self = Self(0);
    pub const SOLID: Self = Self(1);
    pub const LIQUID: Self = Self(2);
    pub const GAS: Self = Self(4);
    pub const PLASMA: Self = Self(8);
    pub const SPIRIT: Self = Self(16);
    pub const ALL: Self = Self(31);

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "solid" => Some(Self::SOLID),
            "liquid" => Some(Self::LIQUID),
            "gas" => Some(Self::GAS),
            "plasma" => Some(Self::PLASMA),
            "spirit" => Some(Self::SPIRIT),
            "all" => Some(Self::ALL),
            "none" => Some(Self::NONE),
            _ => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: Matter) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: Matter) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Matter) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for Matter {
    type Output = Matter;

    fn bitor(self, rhs: Matter) -> Matter {
        self.union(rhs)
    }
}

impl TryFrom<Vec<String>> for Matter {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().try_fold(Matter::NONE, |acc, name| {
            Matter::from_name(name)
                .map(|matter| acc | matter)
                .ok_or_else(|| format!("unknown matter \"{}\"", name))
        })
    }
}
