pub mod candy_machine;
pub mod countdown;
pub mod gallery;
pub mod mint_button;
pub mod wallet;
