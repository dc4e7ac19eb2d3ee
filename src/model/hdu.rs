use ndarray::ArrayD;

use super::HduHeader;

/// One header/data unit. `data` is `None` for data-less or non-image HDUs.
#[derive(Debug, Clone, Default)]
pub struct Hdu {
    pub header: HduHeader,
    pub data: Option<ArrayD<f32>>,
}

impl Hdu {
    pub fn new(header: HduHeader, data: Option<ArrayD<f32>>) -> Self {
        Self { header, data }
    }

    pub fn from_data(data: ArrayD<f32>) -> Self {
        Self {
            header: HduHeader::default(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HduList {
    pub hdus: Vec<Hdu>,
}

impl HduList {
    pub fn new(hdus: Vec<Hdu>) -> Self {
        Self { hdus }
    }

    pub fn get(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }
}
