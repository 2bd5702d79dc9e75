//! The single fixed graphics pipeline and its render pass.
use std::ffi::CStr;

use ash::{vk, Device};

use crate::error::{VkInitError, VkResultExt};

const SHADER_ENTRY: &CStr = c"main";

pub(crate) fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    }
}

pub(crate) fn input_assembly_state() -> vk::PipelineInputAssemblyStateCreateInfo<'static> {
    vk::PipelineInputAssemblyStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        primitive_restart_enable: vk::FALSE,
        ..Default::default()
    }
}

pub(crate) fn rasterization_state() -> vk::PipelineRasterizationStateCreateInfo<'static> {
    vk::PipelineRasterizationStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
        depth_clamp_enable: vk::FALSE,
        rasterizer_discard_enable: vk::FALSE,
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::BACK,
        front_face: vk::FrontFace::CLOCKWISE,
        depth_bias_enable: vk::FALSE,
        line_width: 1.0,
        ..Default::default()
    }
}

pub(crate) fn multisample_state() -> vk::PipelineMultisampleStateCreateInfo<'static> {
    vk::PipelineMultisampleStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
        rasterization_samples: vk::SampleCountFlags::TYPE_1,
        sample_shading_enable: vk::FALSE,
        min_sample_shading: 1.0,
        ..Default::default()
    }
}

// No blending; write all RGBA
pub(crate) fn color_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState {
        color_write_mask: vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A,
        blend_enable: vk::FALSE,
        src_color_blend_factor: vk::BlendFactor::ONE,
        dst_color_blend_factor: vk::BlendFactor::ZERO,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        alpha_blend_op: vk::BlendOp::ADD,
    }
}

pub(crate) static DYNAMIC_STATES: [vk::DynamicState; 2] =
    [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

pub(crate) unsafe fn create_render_pass(
    device: &Device,
    format: vk::Format,
) -> Result<vk::RenderPass, VkInitError> {
    let color_att = color_attachment(format);
    let att_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &att_ref,
        ..Default::default()
    };
    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_att,
        subpass_count: 1,
        p_subpasses: &subpass,
        ..Default::default()
    };
    device
        .create_render_pass(&rp_info, None)
        .stage("vkCreateRenderPass")
}

/// No descriptor sets and no push constants.
pub(crate) unsafe fn create_pipeline_layout(
    device: &Device,
) -> Result<vk::PipelineLayout, VkInitError> {
    let layout_info = vk::PipelineLayoutCreateInfo {
        s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
        ..Default::default()
    };
    device
        .create_pipeline_layout(&layout_info, None)
        .stage("vkCreatePipelineLayout")
}

pub(crate) unsafe fn create_shader_module(
    device: &Device,
    code: &[u32],
) -> Result<vk::ShaderModule, VkInitError> {
    let ci = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        p_code: code.as_ptr(),
        code_size: code.len() * 4,
        ..Default::default()
    };
    device
        .create_shader_module(&ci, None)
        .stage("vkCreateShaderModule")
}

/// Shader modules only live for the duration of this call.
pub(crate) unsafe fn create_graphics_pipeline(
    device: &Device,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    vertex: &[u32],
    fragment: &[u32],
) -> Result<vk::Pipeline, VkInitError> {
    let vs = create_shader_module(device, vertex)?;
    let fs = match create_shader_module(device, fragment) {
        Ok(fs) => fs,
        Err(err) => {
            device.destroy_shader_module(vs, None);
            return Err(err);
        }
    };

    let result = build_pipeline(device, layout, render_pass, vs, fs);

    device.destroy_shader_module(fs, None);
    device.destroy_shader_module(vs, None);
    result
}

unsafe fn build_pipeline(
    device: &Device,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    vs: vk::ShaderModule,
    fs: vk::ShaderModule,
) -> Result<vk::Pipeline, VkInitError> {
    let stages = [
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::VERTEX,
            module: vs,
            p_name: SHADER_ENTRY.as_ptr(),
            ..Default::default()
        },
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::FRAGMENT,
            module: fs,
            p_name: SHADER_ENTRY.as_ptr(),
            ..Default::default()
        },
    ];

    // Vertices come from gl_VertexIndex
    let vertex_input = vk::PipelineVertexInputStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
        ..Default::default()
    };
    let input_assembly = input_assembly_state();
    let dynamic_state = vk::PipelineDynamicStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO,
        dynamic_state_count: DYNAMIC_STATES.len() as u32,
        p_dynamic_states: DYNAMIC_STATES.as_ptr(),
        ..Default::default()
    };
    let viewport_state = vk::PipelineViewportStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
        viewport_count: 1,
        p_viewports: std::ptr::null(), // dynamic
        scissor_count: 1,
        p_scissors: std::ptr::null(), // dynamic
        ..Default::default()
    };
    let raster = rasterization_state();
    let multisample = multisample_state();
    let color_blend_att = color_blend_attachment();
    let color_blend = vk::PipelineColorBlendStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
        logic_op_enable: vk::FALSE,
        logic_op: vk::LogicOp::COPY,
        attachment_count: 1,
        p_attachments: &color_blend_att,
        ..Default::default()
    };

    let pipeline_info = vk::GraphicsPipelineCreateInfo {
        s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
        stage_count: stages.len() as u32,
        p_stages: stages.as_ptr(),
        p_vertex_input_state: &vertex_input,
        p_input_assembly_state: &input_assembly,
        p_viewport_state: &viewport_state,
        p_rasterization_state: &raster,
        p_multisample_state: &multisample,
        p_color_blend_state: &color_blend,
        p_dynamic_state: &dynamic_state,
        layout,
        render_pass,
        subpass: 0,
        base_pipeline_handle: vk::Pipeline::null(),
        base_pipeline_index: -1,
        ..Default::default()
    };

    let pipelines = device
        .create_graphics_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&pipeline_info),
            None,
        )
        .map_err(|(_, result)| VkInitError::Vk {
            stage: "vkCreateGraphicsPipelines",
            result,
        })?;
    pipelines
        .into_iter()
        .next()
        .ok_or(VkInitError::Vk {
            stage: "vkCreateGraphicsPipelines",
            result: vk::Result::ERROR_UNKNOWN,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attachment_clears_and_presents() {
        let att = color_attachment(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(att.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(att.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(att.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(att.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(att.stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
        assert_eq!(att.stencil_store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(att.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(att.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn rasterizer_culls_back_faces_wound_clockwise() {
        let raster = rasterization_state();
        assert_eq!(raster.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(raster.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(raster.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(raster.line_width, 1.0);
        assert_eq!(raster.depth_bias_enable, vk::FALSE);
        assert_eq!(raster.depth_clamp_enable, vk::FALSE);
    }

    #[test]
    fn triangle_list_without_restart() {
        let ia = input_assembly_state();
        assert_eq!(ia.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(ia.primitive_restart_enable, vk::FALSE);
    }

    #[test]
    fn single_sample_no_blending() {
        assert_eq!(
            multisample_state().rasterization_samples,
            vk::SampleCountFlags::TYPE_1
        );
        let blend = color_blend_attachment();
        assert_eq!(blend.blend_enable, vk::FALSE);
        assert_eq!(
            blend.color_write_mask,
            vk::ColorComponentFlags::R
                | vk::ColorComponentFlags::G
                | vk::ColorComponentFlags::B
                | vk::ColorComponentFlags::A
        );
    }

    #[test]
    fn viewport_and_scissor_are_dynamic() {
        assert_eq!(
            DYNAMIC_STATES,
            [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
        );
    }
}
