//! Plain userspace backtraces.

use tracing::warn;

use crate::patterns::PlainFrameLine;
use crate::session::Symbolizer;
use crate::tools::ToolRunner;
use crate::types::{Address, Frame, Resolution};

impl<T: ToolRunner> Symbolizer<T>
{
    /// Resolve a `bt#NN: pc .. sp .. (dso,offset)` frame.
    ///
    /// The offset is KASLR-adjusted, the DSO located and the offset looked
    /// up at its call site. With disassembly enabled, a resolved frame also
    /// gets the disassembly of its function, rebased to the DSO load bias.
    pub(crate) fn plain_frame(&mut self, line: &PlainFrameLine) -> Frame
    {
        let offset = self.kaslr.adjust(line.offset);
        let path = self.directory.resolve(&line.dso, self.records.build_ids());

        let resolution = match &path {
            Some(path) => self.call_site_resolution(path, offset),
            None => Resolution::Unknown(format!("can't find full path for {}", line.dso)),
        };

        let mut frame = Frame::new(line.number, resolution);
        frame.stack_pointer = Some(line.sp);
        frame.dso = Some(line.dso.clone());
        frame.offset = Some(offset);

        if self.config.disassemble && frame.resolution.is_resolved() {
            if let Some(path) = &path {
                let bias = self.records.bias_of(&line.dso).unwrap_or(Address::ZERO);
                match self
                    .resolver
                    .disassemble_at(self.directory.architecture(), path, offset, bias)
                {
                    Ok(lines) => frame.disassembly = lines,
                    Err(err) => warn!("failed to disassemble {} at {offset}: {err}", path.display()),
                }
            }
        }

        frame
    }
}
