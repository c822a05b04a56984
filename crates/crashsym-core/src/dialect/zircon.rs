//! Kernel panic backtraces.

use tracing::{error, info};

use super::{Mode, ZirconContext};
use crate::error::{Result, SymbolizeError};
use crate::kaslr::KaslrAdjuster;
use crate::session::Symbolizer;
use crate::tools::ToolRunner;
use crate::types::{Address, Frame, Resolution};

impl<T: ToolRunner> Symbolizer<T>
{
    /// Start a new kernel panic context.
    ///
    /// Locates the kernel binary and reads its `__code_start`. If either
    /// step fails the kernel handler stays off until the next panic.
    pub(crate) fn arm_zircon(&mut self)
    {
        self.zircon = None;
        self.kaslr = KaslrAdjuster::identity();

        match self.load_zircon_context() {
            Ok(context) => {
                info!(
                    "kernel panic: {} with __code_start at {}",
                    context.elf_path.display(),
                    context.code_start
                );
                self.kaslr.code_start = Some(context.code_start);
                self.zircon = Some(context);
                self.mode = Mode::ZirconArmed;
            }
            Err(err) => {
                error!("kernel backtraces will not be symbolized: {err}");
                self.mode = Mode::Idle;
            }
        }
    }

    fn load_zircon_context(&self) -> Result<ZirconContext>
    {
        let name = &self.config.kernel_name;
        let elf_path = self
            .directory
            .find_file(name)
            .ok_or_else(|| SymbolizeError::KernelNotFound(name.clone()))?;
        let code_start = self
            .resolver
            .code_start(self.directory.architecture(), &elf_path)?;

        Ok(ZirconContext {
            elf_path,
            code_start,
            pending_pc: None,
        })
    }

    /// Resolve a `bt#NN: 0xADDR` kernel frame.
    ///
    /// A faulting PC captured from the register dump is consumed here and
    /// printed ahead of the frame.
    pub(crate) fn zircon_frame(&mut self, number: u32, address: Address) -> Frame
    {
        let Some(context) = self.zircon.as_mut() else {
            return Frame::new(number, Resolution::Unknown("no kernel panic context".to_string()));
        };
        let pending_pc = context.pending_pc.take();
        let elf_path = context.elf_path.clone();

        let adjusted = self.kaslr.adjust(address);
        let mut frame = Frame::new(number, self.call_site_resolution(&elf_path, adjusted));
        frame.dso = Some(self.config.kernel_name.clone());
        frame.offset = Some(adjusted);

        if let Some(pc) = pending_pc {
            let pc = self.kaslr.adjust(pc);
            frame.faulting_pc = Some(self.exact_resolution(&elf_path, pc));
        }
        frame
    }
}
