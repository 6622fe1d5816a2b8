//! Note-count extraction for Beatmania IIDX chart archives.
//!
//! Two coupled binary decoders (kbinxml, ifs) and a resolver that stitches
//! them together to answer "how many notes does this chart have".

mod chart;
mod error;
mod ifs;
mod kbin;
mod kbin_types;
mod resolver;
mod sixbit;
mod stream;

pub use chart::{ChartId, MAX_CHART_COUNT};
pub use error::{NoteCountError, Result};
pub use ifs::extract_manifest;
pub use kbin::{decode, Document, Element};
pub use resolver::ChartResolver;
pub use stream::{ByteStream, Endian};
