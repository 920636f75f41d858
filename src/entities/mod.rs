pub mod archetype;
pub mod character;
pub mod equipment;
pub mod inventory;
pub mod matter;
pub mod object;
pub mod owner;
pub mod skills;
