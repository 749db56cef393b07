//! Bitflag wrappers over the PE/COFF characteristics fields.
//!
//! Each wrapper is a thin newtype over the raw integer plus one `is_*`
//! predicate per documented flag. [`bitflag_wrapper!`] generates the
//! repetitive predicate methods so adding a new flag is a one-line addition
//! instead of a copy-pasted method.

macro_rules! bitflag_wrapper {
    ($name:ident : $repr:ty { $( $flag:ident = $value:expr => $pred:ident ),+ $(,)? }) => {
        paste::paste! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $name(pub $repr);

            impl $name {
                $( pub const $flag: $repr = $value; )+

                pub fn new(value: $repr) -> $name {
                    $name(value)
                }

                pub fn raw(&self) -> $repr {
                    self.0
                }

                pub fn has(&self, flag: $repr) -> bool {
                    self.0 & flag != 0
                }

                $(
                    pub fn $pred(&self) -> bool {
                        self.has(Self::$flag)
                    }
                )+
            }
        }
    };
}

bitflag_wrapper!(FileCharacteristics: u16 {
    IMAGE_FILE_RELOCS_STRIPPED = 0x0001 => is_relocs_stripped,
    IMAGE_FILE_EXECUTABLE_IMAGE = 0x0002 => is_executable_image,
    IMAGE_FILE_32BIT_MACHINE = 0x0100 => is_32bit_machine,
    IMAGE_FILE_DLL = 0x2000 => is_dll,
});

bitflag_wrapper!(SectionCharacteristics: u32 {
    IMAGE_SCN_CNT_CODE = 0x0000_0020 => is_code,
    IMAGE_SCN_CNT_INITIALIZED_DATA = 0x0000_0040 => is_initialized_data,
    IMAGE_SCN_CNT_UNINITIALIZED_DATA = 0x0000_0080 => is_uninitialized_data,
    IMAGE_SCN_MEM_EXECUTE = 0x2000_0000 => is_execute,
    IMAGE_SCN_MEM_READ = 0x4000_0000 => is_read,
    IMAGE_SCN_MEM_WRITE = 0x8000_0000 => is_write,
});
