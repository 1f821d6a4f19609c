pub mod hollaex;
