pub mod file;
pub mod source;

pub use file::AudioFile;
pub use source::{AudioDescriptor, AudioHandle, AudioProvider, FileAudioProvider};
