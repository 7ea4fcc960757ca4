//! MTD ioctl definitions (`mtd/mtd-abi.h`)

/// Argument of `MEMERASE`, matches `struct erase_info_user`
#[repr(C)]
pub struct EraseInfo {
    pub start: u32,
    pub length: u32,
}

/// Argument of `MEMERASE64`, matches `struct erase_info_user64`
#[repr(C)]
pub struct EraseInfo64 {
    pub start: u64,
    pub length: u64,
}

/// Result of `MEMGETINFO`, matches `struct mtd_info_user`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct MtdInfoUser {
    pub type_: u8,
    pub flags: u32,
    pub size: u32,
    pub erasesize: u32,
    pub writesize: u32,
    pub oobsize: u32,
    pub padding: u64,
}

// MEMGETINFO = _IOR('M', 1, struct mtd_info_user)
nix::ioctl_read!(memgetinfo, b'M', 1, MtdInfoUser);
// MEMERASE = _IOW('M', 2, struct erase_info_user)
nix::ioctl_write_ptr!(memerase, b'M', 2, EraseInfo);
// MEMGETREGIONCOUNT = _IOR('M', 7, int)
nix::ioctl_read!(memgetregioncount, b'M', 7, libc::c_int);
// MEMGETBADBLOCK = _IOW('M', 11, __kernel_loff_t)
nix::ioctl_write_ptr!(memgetbadblock, b'M', 11, libc::loff_t);
// MEMSETBADBLOCK = _IOW('M', 12, __kernel_loff_t)
nix::ioctl_write_ptr!(memsetbadblock, b'M', 12, libc::loff_t);
// MEMERASE64 = _IOW('M', 20, struct erase_info_user64)
nix::ioctl_write_ptr!(memerase64, b'M', 20, EraseInfo64);
