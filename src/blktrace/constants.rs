//! Action encoding of the kernel `blk_io_trace` record.
//!
//! The action word packs two things: the low 16 bits hold the action opcode
//! (`__BLK_TA_*` / `__BLK_TN_*`), the high 16 bits hold the category mask
//! (`BLK_TC_*`). Values match `include/uapi/linux/blktrace_api.h`.

/// Magic carried in the upper 24 bits of `blk_io_trace::magic`.
pub const BLK_IO_TRACE_MAGIC: u32 = 0x6561_7400;

/// Mask selecting the magic bits; the low byte is the format version.
pub const BLK_IO_TRACE_MAGIC_MASK: u32 = 0xffff_ff00;

/// Shift applied to a category bit to place it in the action word.
pub const BLK_TC_SHIFT: u32 = 16;

pub const BLK_TC_READ: u32 = 1 << 0;
pub const BLK_TC_WRITE: u32 = 1 << 1;
pub const BLK_TC_FLUSH: u32 = 1 << 2;
pub const BLK_TC_SYNC: u32 = 1 << 3;
pub const BLK_TC_QUEUE: u32 = 1 << 4;
pub const BLK_TC_REQUEUE: u32 = 1 << 5;
pub const BLK_TC_ISSUE: u32 = 1 << 6;
pub const BLK_TC_COMPLETE: u32 = 1 << 7;
pub const BLK_TC_FS: u32 = 1 << 8;
pub const BLK_TC_PC: u32 = 1 << 9;
pub const BLK_TC_NOTIFY: u32 = 1 << 10;
pub const BLK_TC_AHEAD: u32 = 1 << 11;
pub const BLK_TC_META: u32 = 1 << 12;
pub const BLK_TC_DISCARD: u32 = 1 << 13;
pub const BLK_TC_DRV_DATA: u32 = 1 << 14;
pub const BLK_TC_FUA: u32 = 1 << 15;

/// Equivalent of the kernel's `BLK_TC_ACT()` macro.
#[inline(always)]
pub const fn blk_tc_act(category: u32) -> u32 {
    category << BLK_TC_SHIFT
}

pub const BLK_TA_QUEUE: u32 = 1;
pub const BLK_TA_BACKMERGE: u32 = 2;
pub const BLK_TA_FRONTMERGE: u32 = 3;
pub const BLK_TA_GETRQ: u32 = 4;
pub const BLK_TA_SLEEPRQ: u32 = 5;
pub const BLK_TA_REQUEUE: u32 = 6;
pub const BLK_TA_ISSUE: u32 = 7;
pub const BLK_TA_COMPLETE: u32 = 8;
pub const BLK_TA_PLUG: u32 = 9;
pub const BLK_TA_UNPLUG_IO: u32 = 10;
pub const BLK_TA_UNPLUG_TIMER: u32 = 11;
pub const BLK_TA_INSERT: u32 = 12;
pub const BLK_TA_SPLIT: u32 = 13;
pub const BLK_TA_BOUNCE: u32 = 14;
pub const BLK_TA_REMAP: u32 = 15;
pub const BLK_TA_ABORT: u32 = 16;
pub const BLK_TA_DRV_DATA: u32 = 17;

/// Set on records whose payload starts with a 64-bit cgroup id.
pub const BLK_TA_CGROUP: u32 = 1 << 8;

/// Size of the cgroup id prefix carried by `BLK_TA_CGROUP` records.
pub const CGROUP_ID_LEN: usize = 8;

pub const BLK_TN_PROCESS: u32 = blk_tc_act(BLK_TC_NOTIFY);
pub const BLK_TN_TIMESTAMP: u32 = 1 | blk_tc_act(BLK_TC_NOTIFY);
pub const BLK_TN_MESSAGE: u32 = 2 | blk_tc_act(BLK_TC_NOTIFY);

/// Mask extracting the opcode from an action word.
pub const BLK_TA_MASK: u32 = 0xffff;

/// Lifecycle opcode (`__BLK_TA_*`) of an action word, cgroup marker ignored.
pub const fn blk_ta_opcode(action: u32) -> u32 {
    action & !BLK_TA_CGROUP & BLK_TA_MASK
}

/// Largest payload accepted after a header. Process names, remap records
/// and notify messages are all far below this.
pub const MAX_PDU_LEN: usize = 4096;
