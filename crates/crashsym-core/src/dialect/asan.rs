//! Sanitizer backtraces.
//!
//! Sanitizer frames carry a bare runtime address. The owning DSO is the one
//! loaded at the highest bias not above the address.

use crate::session::Symbolizer;
use crate::tools::ToolRunner;
use crate::types::{Address, Frame, Resolution};

impl<T: ToolRunner> Symbolizer<T>
{
    /// Resolve a `{{{bt:NN:0xADDR}}}` frame.
    pub(crate) fn asan_frame(&mut self, number: u32, address: Address) -> Frame
    {
        let Some((bias, name)) = self
            .records
            .nearest_below(address)
            .map(|(bias, name)| (bias, name.to_string()))
        else {
            return Frame::new(
                number,
                Resolution::Unknown(format!("can't find DSO for address {address}")),
            );
        };

        let offset = self.kaslr.adjust(address - bias.value());
        let resolution = match self.directory.resolve(&name, self.records.build_ids()) {
            Some(path) => self.call_site_resolution(&path, offset),
            None => Resolution::Unknown(format!("can't find full path for {name}")),
        };

        let mut frame = Frame::new(number, resolution);
        frame.dso = Some(name);
        frame.offset = Some(offset);
        frame
    }
}
