use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use log::debug;
use std::{collections::HashMap, path::Path};

/// Named tensors detached from the variables they were copied from.
///
/// Used to move parameters between [`VarMap`]s living on different devices
/// and to save them as a single safetensors file.
#[derive(Clone, Debug)]
pub struct NamedTensors {
    /// Tensors keyed by variable names.
    pub named_tensors: HashMap<String, Tensor>,
}

impl NamedTensors {
    /// Copies the variables of the given [`VarMap`]s.
    ///
    /// Names must be unique across the maps.
    pub fn copy_from(varmaps: &[&VarMap]) -> Result<Self> {
        let mut named_tensors = HashMap::new();
        for vm in varmaps.iter() {
            let data = vm
                .data()
                .lock()
                .map_err(|_| anyhow!("Failed to lock VarMap"))?;
            for (name, var) in data.iter() {
                let t = var.as_tensor().detach().copy()?;
                if named_tensors.insert(name.clone(), t).is_some() {
                    return Err(anyhow!("Duplicated variable name {}", name));
                }
            }
        }
        Ok(Self { named_tensors })
    }

    /// Copies the tensors to the variables of the same names in `vm`.
    ///
    /// Every variable in `vm` must have a counterpart; extra tensors are
    /// ignored so that one set of tensors can feed several maps.
    pub fn copy_to(&self, vm: &VarMap) -> Result<()> {
        let data = vm
            .data()
            .lock()
            .map_err(|_| anyhow!("Failed to lock VarMap"))?;
        for (name, var) in data.iter() {
            let src = self
                .named_tensors
                .get(name)
                .ok_or_else(|| anyhow!("Tensor {} not found", name))?;
            var.set(&src.to_device(var.device())?)?;
        }
        debug!("Copied {} tensors", data.len());
        Ok(())
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.named_tensors.len()
    }

    /// Returns `true` if there is no tensor.
    pub fn is_empty(&self) -> bool {
        self.named_tensors.is_empty()
    }

    /// Saves the tensors as a safetensors file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        candle_core::safetensors::save(&self.named_tensors, path.as_ref())?;
        Ok(())
    }

    /// Loads tensors from a safetensors file onto `device`.
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self> {
        let named_tensors = candle_core::safetensors::load(path.as_ref(), device)?;
        Ok(Self { named_tensors })
    }
}

#[cfg(test)]
mod test {
    use super::NamedTensors;
    use anyhow::Result;
    use candle_core::{DType, Device, Module, Tensor};
    use candle_nn::{linear, VarBuilder, VarMap};
    use tempdir::TempDir;

    fn model(vm: &VarMap) -> Result<candle_nn::Sequential> {
        let vb = VarBuilder::from_varmap(vm, DType::F32, &Device::Cpu);
        Ok(candle_nn::seq()
            .add(linear(3, 8, vb.pp("layer1"))?)
            .add(linear(8, 2, vb.pp("layer2"))?))
    }

    #[test]
    fn test_named_tensors() -> Result<()> {
        let xs = Tensor::from_slice(&[1f32, 2.0, 3.0], (1, 3), &Device::Cpu)?;
        let vm1 = VarMap::new();
        let model1 = model(&vm1)?;
        let vm2 = VarMap::new();
        let model2 = model(&vm2)?;

        let t1 = model1.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        let t2 = model2.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert_ne!(t1, t2);

        let nt = NamedTensors::copy_from(&[&vm1])?;
        assert_eq!(nt.len(), 4);
        nt.copy_to(&vm2)?;
        let t3 = model2.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(t1, t3);

        // Later changes of the source do not affect the copy
        let w = vm1.data().lock().unwrap()["layer1.weight"].clone();
        w.set(&w.as_tensor().zeros_like()?)?;
        let copied = nt.named_tensors["layer1.weight"].abs()?.sum_all()?;
        assert!(copied.to_scalar::<f32>()? > 0.0);

        // Round trip through a file
        let dir = TempDir::new("named_tensors")?;
        let path = dir.path().join("params.safetensors");
        nt.save(&path)?;
        let vm3 = VarMap::new();
        let model3 = model(&vm3)?;
        NamedTensors::load(&path, &Device::Cpu)?.copy_to(&vm3)?;
        let t4 = model3.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(t1, t4);
        Ok(())
    }

    #[test]
    fn test_copy_to_missing_tensor() -> Result<()> {
        let vm1 = VarMap::new();
        let _ = model(&vm1)?;
        let nt = NamedTensors::copy_from(&[])?;
        assert!(nt.is_empty());
        assert!(nt.copy_to(&vm1).is_err());
        Ok(())
    }
}
