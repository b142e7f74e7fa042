//! Property key namespace for embedded image metadata.
//!
//! Two families exist: Exif tags shared by JPEG/TIFF-style containers,
//! and GIF tags describing animation behavior. Keys outside these
//! families are passed through to the metadata store opaquely.

/// Exif tag names.
pub mod exif {
    pub const ARTIST: &str = "Artist";
    pub const BITS_PER_SAMPLE: &str = "BitsPerSample";
    pub const COMPRESSION: &str = "Compression";
    pub const COPYRIGHT: &str = "Copyright";
    pub const DATETIME: &str = "DateTime";
    pub const DATETIME_ORIGINAL: &str = "DateTimeOriginal";
    pub const EXPOSURE_TIME: &str = "ExposureTime";
    pub const F_NUMBER: &str = "FNumber";
    pub const FOCAL_LENGTH: &str = "FocalLength";
    pub const GPS_ALTITUDE: &str = "GPSAltitude";
    pub const GPS_ALTITUDE_REF: &str = "GPSAltitudeRef";
    pub const GPS_LATITUDE: &str = "GPSLatitude";
    pub const GPS_LATITUDE_REF: &str = "GPSLatitudeRef";
    pub const GPS_LONGITUDE: &str = "GPSLongitude";
    pub const GPS_LONGITUDE_REF: &str = "GPSLongitudeRef";
    pub const IMAGE_DESCRIPTION: &str = "ImageDescription";
    pub const IMAGE_LENGTH: &str = "ImageLength";
    pub const IMAGE_WIDTH: &str = "ImageWidth";
    pub const ISO_SPEED_RATINGS: &str = "ISOSpeedRatings";
    pub const MAKE: &str = "Make";
    pub const MODEL: &str = "Model";
    pub const ORIENTATION: &str = "Orientation";
    pub const PIXEL_X_DIMENSION: &str = "PixelXDimension";
    pub const PIXEL_Y_DIMENSION: &str = "PixelYDimension";
    pub const RESOLUTION_UNIT: &str = "ResolutionUnit";
    pub const SOFTWARE: &str = "Software";
}

/// GIF tag names. Frame-scoped tags aggregate over frame 0 when no
/// frame index is supplied.
pub mod gif {
    pub const LOOP_COUNT: &str = "GIFLoopCount";
    pub const DELAY_TIME: &str = "GIFDelayTime";
}
